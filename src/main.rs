mod cli;
mod config;
mod duration;
mod error;
mod oms;
mod pager;
mod pipeline;
mod rules;
mod ui;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::OmsConfig;
use error::ReasonerError;
use oms::{OmsClient, OmsGateway};
use pipeline::{Pipeline, RandomSelector};
use ui::{LogWriter, RunProgress};

fn init_tracing(verbose: bool, writer: LogWriter) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(move || writer.clone())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let progress = RunProgress::new();
    init_tracing(cli.verbose, progress.log_writer());

    match execute(cli, &progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli, progress: &RunProgress) -> anyhow::Result<()> {
    let mut config = OmsConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(policy) = cli.policy {
        config.policy = policy.into();
    }
    let rules = config.rule_book()?;

    match cli.command {
        Command::Rules => {
            ui::print_rules(&rules);
        }
        Command::Pending { fetch } => {
            let client = OmsClient::new(&config.base_url)?;
            let session = client
                .login(&config.credentials)
                .await
                .map_err(ReasonerError::Auth)?;
            let records = pager::fetch_all(
                &client,
                &session,
                &fetch.filter(),
                &config.pager_settings(fetch.limit),
            )
            .await
            .map_err(ReasonerError::Fetch)?;
            let classification = pipeline::classify_outages(records, &rules, Utc::now());
            ui::print_classification(&classification);
        }
        Command::Run {
            fetch,
            dry_run,
            seed,
        } => {
            let client = OmsClient::new(&config.base_url)?;
            let selector = seed.map_or_else(RandomSelector::new, RandomSelector::seeded);
            let mut pipeline =
                Pipeline::new(&client, &rules, config.pipeline_settings(dry_run), selector);

            progress.start("Logging in and fetching pending outages...");
            let result = pipeline
                .run(
                    &config.credentials,
                    &fetch.filter(),
                    &config.pager_settings(fetch.limit),
                    progress,
                )
                .await;
            progress.finish();
            ui::print_report(&result?);
        }
    }
    Ok(())
}
