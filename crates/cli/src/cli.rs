//! Command-line definition for `zkpass`.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use zkpass_prover::calldata::DEFAULT_AMOUNT;

/// Issue, rotate and prove private borrower passes.
#[derive(Parser, Debug)]
#[command(name = "zkpass", version, about, propagate_version = true)]
pub struct ZkPassCli {
    /// Path to the configuration file (TOML). Defaults to `zkpass.toml`.
    #[arg(long, short = 'c', env = "ZKPASS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate Groth16 keys for the pass circuit.
    Setup(SetupArgs),
    /// Issue a pass for a borrower and append its leaf to the allowlist.
    Issue(IssueArgs),
    /// Advance a pass's nonce and re-derive its nullifier, in place.
    Rotate(RotateArgs),
    /// Prove a pass and write Solidity calldata.
    Prove(ProveArgs),
    /// Verify a calldata artifact against the stored verifying key.
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Tree depth the keys are generated for. Defaults to `tree.depth`.
    #[arg(long)]
    pub depth: Option<usize>,

    /// Output directory. Defaults to `proving.keys_dir`.
    #[arg(long)]
    pub keys_dir: Option<PathBuf>,

    /// Replace existing keys for this depth.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Borrower address, `0x` followed by 40 hex digits.
    pub borrower: String,

    /// Where to write the pass. Defaults to `<storage.pass_dir>/pass.<borrower>.json`.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Overwrite an existing pass file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Pass file to rotate.
    pub pass: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProveArgs {
    /// Pass file to prove.
    pub pass: PathBuf,

    /// Borrowed amount in whole tokens (up to 18 decimals).
    #[arg(default_value = DEFAULT_AMOUNT)]
    pub amount: String,

    /// Calldata output path. Defaults to `proving.calldata_output`.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Skip local verification before writing calldata.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("statement").required(true).args(["borrower", "pass"])))]
pub struct VerifyArgs {
    /// Calldata artifact to verify.
    pub calldata: PathBuf,

    /// Borrower the proof was made for.
    #[arg(long)]
    pub borrower: Option<String>,

    /// Take borrower and depth from this pass file.
    #[arg(long)]
    pub pass: Option<PathBuf>,

    /// Tree depth of the verifying key. Defaults to the pass depth or `tree.depth`.
    #[arg(long)]
    pub depth: Option<usize>,
}
