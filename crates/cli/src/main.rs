mod cli;
mod output;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flurry_sql::{
    ClientConfig, ExecutionCoordinator, StatementHandle, StatementRequest, TokenIssuer,
};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::output::{print_ack, print_result};

/// Load `.env` (or the given file) into the process environment, then build
/// the log filter so a `RUST_LOG` from the file takes effect.
fn load_environment(dotenv_path: Option<&Path>) -> EnvFilter {
    let _ = match dotenv_path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(load_environment(None))
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.profile {
        Some(profile) => ClientConfig::from_env_profiled(&profile.to_uppercase()),
        None => ClientConfig::from_env(),
    }
    .context("failed to load connection settings")?;

    if let Command::Token = args.command {
        let issuer =
            TokenIssuer::new(&config.token_config()).context("failed to load key pair")?;
        let credential = issuer.issue().context("failed to issue token")?;
        info!(subject = %issuer.subject(), fingerprint = %issuer.fingerprint(), "Issued token");
        println!("{}", credential.as_str());
        return Ok(());
    }

    let coordinator =
        ExecutionCoordinator::new(config).context("failed to create statement client")?;

    match args.command {
        Command::Run(run) => run_statement(&coordinator, run, args.json).await,

        Command::Status { handle, partition } => {
            let handle = StatementHandle::new(handle);
            let (result, status) = coordinator
                .poll(&handle, partition)
                .await
                .with_context(|| format!("failed to poll statement '{handle}'"))?;
            info!(handle = %handle, http_status = status.as_u16(), "Polled");
            print_result(&result, args.json)
        }

        Command::Wait { handle, poll } => {
            let handle = StatementHandle::new(handle);
            let result = coordinator
                .wait_until_complete(
                    &handle,
                    Duration::from_millis(poll.interval_ms),
                    poll.max_attempts,
                )
                .await
                .with_context(|| format!("statement '{handle}' did not complete"))?;
            print_result(&result, args.json)
        }

        Command::Cancel { handle } => {
            let handle = StatementHandle::new(handle);
            coordinator
                .cancel(&handle)
                .await
                .with_context(|| format!("failed to cancel statement '{handle}'"))?;
            print_ack(handle.as_str(), "cancellation requested", args.json)
        }

        Command::Token => Ok(()),
    }
}

async fn run_statement(
    coordinator: &ExecutionCoordinator,
    run: RunArgs,
    as_json: bool,
) -> Result<()> {
    let mut request = StatementRequest::new(run.statement)
        .timeout(run.timeout)
        .retry(!run.no_retry);
    request = match run.request_id {
        Some(id) => request.request_id(id),
        None => request.with_generated_request_id(),
    };

    let result = coordinator
        .submit(&request, run.async_exec)
        .await
        .context("statement submission failed")?;

    let result = match result.handle.clone() {
        Some(handle) if run.wait && !result.status.is_terminal() => coordinator
            .wait_until_complete(
                &handle,
                Duration::from_millis(run.poll.interval_ms),
                run.poll.max_attempts,
            )
            .await
            .with_context(|| format!("statement '{handle}' did not complete"))?,
        _ => result,
    };

    print_result(&result, as_json)
}
