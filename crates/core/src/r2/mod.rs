//! radare2 session boundary.
//!
//! The enrichment run needs four things from the analysis engine: run
//! analysis (`aa`), list imports, list call instructions, and set comments.
//! All of it goes through the [`R2Session`] trait so tests can script the
//! engine; [`R2Pipe`] is the real implementation speaking the r2pipe protocol
//! over a child process.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use thiserror::Error;

use crate::model::CallSite;

#[derive(Debug, Error)]
pub enum R2Error {
    #[error("failed to spawn radare2: {0}")]
    Spawn(String),
    #[error("radare2 pipe I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("radare2 pipe closed unexpectedly")]
    ClosedPipe,
    #[error("failed to parse radare2 JSON: {0}")]
    Json(String),
}

/// A live analysis-engine session accepting textual commands.
pub trait R2Session {
    fn cmd(&mut self, command: &str) -> Result<String, R2Error>;
}

/// Persistent radare2 child process.
///
/// The session must stay open for the whole run: comments set with `CC` land
/// in the same session the import listing came from.
pub struct R2Pipe {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl R2Pipe {
    /// Spawn `r2 -q0 <binary>` and wait for the protocol handshake.
    pub fn open(binary: &Path) -> Result<Self, R2Error> {
        let mut child = Command::new(resolve_r2_path())
            .arg("-q0")
            .arg(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| R2Error::Spawn(e.to_string()))?;

        let stdin = child.stdin.take().ok_or(R2Error::ClosedPipe)?;
        let stdout = BufReader::new(child.stdout.take().ok_or(R2Error::ClosedPipe)?);

        let mut pipe = Self { child, stdin, stdout };
        // With -q0 radare2 emits one NUL once it is ready for commands.
        pipe.read_reply()?;
        Ok(pipe)
    }

    /// Read one NUL-terminated reply from the pipe.
    fn read_reply(&mut self) -> Result<String, R2Error> {
        let mut buf = Vec::new();
        self.stdout.read_until(0, &mut buf)?;
        if buf.pop() != Some(0) {
            return Err(R2Error::ClosedPipe);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl R2Session for R2Pipe {
    fn cmd(&mut self, command: &str) -> Result<String, R2Error> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        self.read_reply()
    }
}

impl Drop for R2Pipe {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "q");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

fn resolve_r2_path() -> PathBuf {
    std::env::var_os("R2_BIN").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("r2"))
}

/// Parse the JSON emitted by `/cj call` into call sites.
pub fn parse_call_sites(body: &str) -> Result<Vec<CallSite>, R2Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let calls: Vec<R2Call> = serde_json::from_str(body).map_err(|e| R2Error::Json(e.to_string()))?;
    Ok(calls
        .into_iter()
        .filter_map(|c| {
            let code = c.code?;
            Some(CallSite { address: c.offset.unwrap_or(0), code })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct R2Call {
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    code: Option<String>,
}
