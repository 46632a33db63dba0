pub mod correlate;
pub mod imports;
pub mod pool;
pub mod resolve;
pub mod run;
