use anyhow::{Context, Result};
use batchpost::cli::Cli;
use batchpost::config::SubmitConfig;
use batchpost::console::{json_outcome, ConsoleReporter};
use batchpost::submission::{Attachment, TransferSession};
use batchpost::transport::HttpTransport;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every batch was accepted.
async fn run(cli: Cli) -> Result<bool> {
    let mut config = SubmitConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    let options = config.session_options()?.resume_from(cli.resume_from);

    let document = Attachment::from_path(&cli.document)
        .await
        .context("no document specified")?;
    let mut attachments = Vec::with_capacity(cli.attachments.len());
    for path in &cli.attachments {
        attachments.push(Attachment::from_path(path).await?);
    }

    let transport = HttpTransport::new(config.timeout())?;
    let reporter = if cli.json || cli.quiet {
        ConsoleReporter::hidden()
    } else {
        ConsoleReporter::new()
    };

    let mut session =
        TransferSession::new(options, &document, &attachments, &transport, &reporter)?;
    let result = session.run().await;

    if cli.json {
        println!("{}", json_outcome(&result, session.confirmed())?);
    }

    match result {
        Ok(summary) => {
            tracing::info!(
                "Delivered {} attachment(s) in {} batch(es)",
                summary.attachments,
                summary.batches
            );
            Ok(true)
        }
        Err(err) => {
            if !cli.json {
                eprintln!("{} {}", "failed:".red().bold(), err);
                if err.is_resumable() && session.confirmed() > 0 {
                    eprintln!(
                        "{} rerun with --resume-from {} to skip confirmed attachments",
                        "hint:".yellow(),
                        session.confirmed()
                    );
                }
            }
            Ok(false)
        }
    }
}
