//! `zkpass`: issue, rotate and prove private borrower passes.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkpass_prover::PassError;

mod cli;
mod commands;

use cli::ZkPassCli;

const DEFAULT_LOG_FILTER: &str = "zkpass=info,zkpass_prover=info";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Exit status per failure class. Clap uses 2 for usage errors.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PassError>() {
        Some(PassError::Storage { .. }) => 3,
        Some(PassError::CapacityExceeded { .. }) => 4,
        Some(PassError::IndexOutOfRange { .. }) => 5,
        Some(PassError::ProvingKeyUnavailable { .. }) => 6,
        Some(PassError::Witness(_)) => 7,
        Some(PassError::PublicInputOrdering { .. }) => 8,
        Some(PassError::NullifierReused(_)) => 9,
        Some(PassError::Verification(_)) => 10,
        _ => 1,
    }
}

fn report(err: &anyhow::Error) {
    if let Some(PassError::PublicInputOrdering { .. }) = err.downcast_ref::<PassError>() {
        eprintln!("================================================================");
        eprintln!("  PUBLIC INPUT ORDERING MISMATCH: no calldata was written");
        eprintln!("  expected public signals in order [root, nullifier, borrower, nonce]");
        eprintln!("================================================================");
    }
    eprintln!("error: {:#}", err);
}

fn main() -> ExitCode {
    let cli = ZkPassCli::parse();
    init_tracing();

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}
