use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use docnote_core::fetch::HttpFactory;
use docnote_core::model::{EnrichmentKind, EnrichmentTypes};
use docnote_core::r2::R2Pipe;
use docnote_core::report::Reporter;
use docnote_core::services::imports::default_ignored_modules;
use docnote_core::services::pool::CancelToken;
use docnote_core::services::resolve::{DocResolver, Resolve, ResolverConfig};
use docnote_core::services::run::{enrich, EnrichOptions};

/// Import-documentation enrichment CLI.
///
/// This CLI is a thin wrapper around `docnote-core` (exposed in code as
/// `docnote_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "docnote",
    version,
    about = "Adds MSDN parameter names and documentation URLs to a binary's import call sites",
    long_about = None
)]
struct Cli {
    /// The binary to analyze with radare2.
    #[arg(short, long)]
    binary: PathBuf,

    /// What to feed into the binary: import parameters, MSDN documentation
    /// URLs, or both. Defaults to URLs when not given.
    #[arg(short = 't', long = "type", value_enum)]
    types: Vec<CliEnrichment>,

    /// Cap on concurrent resolution workers. Default is one worker per import.
    #[arg(long)]
    workers: Option<usize>,

    /// Print debug logs (requested URLs, per-annotation details).
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEnrichment {
    /// Parameter lists for imported functions.
    Imports,
    /// MSDN documentation URLs.
    Urls,
}

impl From<CliEnrichment> for EnrichmentKind {
    fn from(value: CliEnrichment) -> Self {
        match value {
            CliEnrichment::Imports => EnrichmentKind::Imports,
            CliEnrichment::Urls => EnrichmentKind::Urls,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.binary.is_file() {
        bail!("Binary file does not exist: {}", cli.binary.display());
    }

    let kinds: Vec<EnrichmentKind> = cli.types.iter().map(|t| (*t).into()).collect();
    let options = EnrichOptions {
        types: EnrichmentTypes::from_kinds(&kinds),
        max_workers: cli.workers,
        ignored_modules: default_ignored_modules(),
    };

    let reporter = Arc::new(Reporter::new(cli.debug));
    let resolver: Arc<dyn Resolve> = Arc::new(DocResolver::new(
        Arc::new(HttpFactory::new()),
        ResolverConfig::default(),
        options.types.params,
        Arc::clone(&reporter),
    ));

    let cancel = Arc::new(CancelToken::new());
    {
        let cancel = Arc::clone(&cancel);
        let reporter = Arc::clone(&reporter);
        ctrlc::set_handler(move || {
            reporter.info("Stopping execution. Changes are not rolled back.");
            cancel.cancel();
        })
        .context("Failed to install interrupt handler")?;
    }

    let mut session = R2Pipe::open(&cli.binary)
        .with_context(|| format!("Failed to open radare2 session for {}", cli.binary.display()))?;

    enrich(&mut session, resolver, &options, &reporter, &cancel)
        .context("Enrichment run failed")?;

    Ok(())
}
