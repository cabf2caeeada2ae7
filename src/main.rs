use std::fs::File;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use bmecat::cli::{Command, OutputFormat};
use bmecat::{
    CancelContext, Cli, ConfigManager, HandlerError, Handlers, InfoReport, Output, PerfReport,
    ReadProgress, Reader, ReaderOptions, VerbosityLevel,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    // Errors can happen before the configuration is loaded.
    let errors = Output::new(VerbosityLevel::Normal, OutputFormat::Human);

    if let Err(message) = cli.validate() {
        eprintln!("{}", errors.format_error(&message));
        process::exit(2);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}", errors.format_error(&format!("{:#}", e)));
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;
    let output = Output::new(config.output.verbosity(), config.output.format.into());

    let file = cli.file_args().file.clone();
    let mut options = ReaderOptions::from_config(&config.reader);
    if config.output.progress {
        options = options.with_progress(Arc::new(|progress: ReadProgress| {
            eprintln!("pass {}: {} bytes", progress.pass, progress.offset);
        }));
    }

    let cancel = CancelContext::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    match cli.command {
        Command::Info(_) => {
            let report =
                tokio::task::spawn_blocking(move || info(&file, options, &cancel)).await??;
            print!("{}", output.format_info(&report));
        }
        Command::Perf(_) => {
            let report =
                tokio::task::spawn_blocking(move || perf(&file, options, &cancel)).await??;
            print!("{}", output.format_perf(&report));
        }
    }

    Ok(())
}

fn open(file: &Path, options: ReaderOptions) -> anyhow::Result<Reader<File>> {
    let source =
        File::open(file).with_context(|| format!("cannot open {}", file.display()))?;
    Ok(Reader::with_options(source, options))
}

/// Reads the header and stops.
fn info(file: &Path, options: ReaderOptions, cancel: &CancelContext) -> anyhow::Result<InfoReport> {
    let mut reader = open(file, options)?;
    let mut header = None;
    reader.run(
        cancel,
        Handlers::new().on_header(|h| {
            header = Some(h);
            Err(HandlerError::EndOfStream)
        }),
    )?;

    let header = header.context("catalog has no HEADER")?;
    Ok(InfoReport::from_header(file, &header))
}

/// Decodes every record and measures the wall time.
fn perf(file: &Path, options: ReaderOptions, cancel: &CancelContext) -> anyhow::Result<PerfReport> {
    let mut reader = open(file, options)?;
    let mut header = None;
    let mut products = 0usize;
    let mut catalog_groups = 0usize;
    let mut classification_groups = 0usize;

    let started = Instant::now();
    reader.run(
        cancel,
        Handlers::new()
            .on_header(|h| {
                header = Some(h);
                Ok(())
            })
            .on_catalog_group(|_| {
                catalog_groups += 1;
                Ok(())
            })
            .on_classification_group(|_| {
                classification_groups += 1;
                Ok(())
            })
            .on_article(|_| {
                products += 1;
                Ok(())
            }),
    )?;
    let elapsed = started.elapsed();

    let header = header.context("catalog has no HEADER")?;
    Ok(PerfReport::new(
        file,
        &header,
        products,
        catalog_groups,
        classification_groups,
        elapsed,
    ))
}
