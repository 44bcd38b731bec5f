use anyhow::Context;
use clap::Parser;
use popeye::cli::Cli;
use popeye::{CancelToken, Console, KubeFetcher, OutputFormat, config, run};
use std::io::{self, Write};
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;
    let config = cli.apply(config)?;
    // Fail on a bad configuration before touching the cluster.
    config.validate()?;

    let cancel = match config.timeout() {
        Some(timeout) => CancelToken::with_timeout(timeout),
        None => CancelToken::new(),
    };
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing with a partial report");
            on_signal.cancel();
        }
    });

    // Install rustls crypto provider (required for TLS connections to K8s API)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let fetcher = KubeFetcher::new(cli.context.as_deref(), config.namespace.clone())
        .await
        .context("Failed to connect to the cluster")?;

    let report = run(&fetcher, config, cancel).await?;

    let stdout = io::stdout();
    match OutputFormat::from(cli.output) {
        OutputFormat::Console => {
            let mut console = Console::new(stdout.lock(), !cli.no_color);
            console.print_header()?;
            console.print_report(&report, report.min_level())?;
            console.print_errors(&report)?;
            console.print_summary(&report)?;
        }
        format => {
            let mut out = stdout.lock();
            writeln!(out, "{}", report.render(format)?)?;
        }
    }
    Ok(())
}
