//! Subcommand handlers. Results go to stdout; diagnostics go through tracing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::rngs::OsRng;
use zkpass_circuits::field::to_hex;
use zkpass_circuits::PoseidonSuite;
use zkpass_prover::config::DEFAULT_CONFIG_FILE;
use zkpass_prover::setup::{load_proving_key, load_verifying_key, proving_key_path, verifying_key_path};
use zkpass_prover::{
    rotate_in_place, scale_amount, verify_calldata, verify_pass, Address, CircuitKeys, Config,
    FileLeafStore, Issuer, NullifierLedger, Pass, PassError, PlaintextPassStore, ProofCalldata, ProofJob,
    SecretStore,
};

use crate::cli::{Commands, IssueArgs, ProveArgs, RotateArgs, SetupArgs, VerifyArgs, ZkPassCli};

pub fn run(cli: ZkPassCli) -> Result<()> {
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load_or_default(&config_path)?;

    match cli.command {
        Commands::Setup(args) => setup(&config, args),
        Commands::Issue(args) => issue(&config, args),
        Commands::Rotate(args) => rotate(args),
        Commands::Prove(args) => prove(&config, args),
        Commands::Verify(args) => verify(&config, args),
    }
}

fn poseidon_suite() -> Result<Arc<PoseidonSuite>> {
    Ok(Arc::new(
        PoseidonSuite::new().context("failed to load Poseidon parameters")?,
    ))
}

fn setup(config: &Config, args: SetupArgs) -> Result<()> {
    let depth = args.depth.unwrap_or(config.tree.depth);
    let keys_dir = args.keys_dir.unwrap_or_else(|| config.proving.keys_dir.clone());

    let pk_path = proving_key_path(&keys_dir, depth);
    if pk_path.exists() && !args.force {
        bail!(
            "keys for depth {} already exist at {}; pass --force to regenerate",
            depth,
            pk_path.display()
        );
    }

    let keys = CircuitKeys::generate(depth, poseidon_suite()?, &mut OsRng)?;
    keys.save_to_directory(&keys_dir)?;

    println!("Proving key: {}", pk_path.display());
    println!("Verifying key: {}", verifying_key_path(&keys_dir, depth).display());
    Ok(())
}

fn issue(config: &Config, args: IssueArgs) -> Result<()> {
    let borrower = args.borrower.parse::<Address>().with_context(|| {
        format!(
            "usage: zkpass issue <borrowerAddress0x...>; got {:?}",
            args.borrower
        )
    })?;

    let out = args.out.unwrap_or_else(|| {
        config
            .storage
            .pass_dir
            .join(format!("pass.{}.json", borrower))
    });
    if out.exists() && !args.force {
        bail!(
            "{} already exists and holds a pass secret; pass --force to replace it",
            out.display()
        );
    }

    let store = FileLeafStore::new(
        &config.tree.snapshot,
        config.tree.create_if_missing,
        config.storage.lock_timeout(),
    );
    let issuer = Issuer::new(store, config.tree.depth);
    let pass = issuer.issue_to(borrower, &PlaintextPassStore, &out, &mut OsRng)?;

    println!("Issued pass for {}", pass.borrower);
    println!("Leaves file: {}", config.tree.snapshot.display());
    println!("Pass file: {}", out.display());
    println!("LeafIndex: {}", pass.leaf_index);
    println!("Root: {}", to_hex(&pass.root));
    println!("Nullifier: {}", to_hex(&pass.nullifier));
    Ok(())
}

fn rotate(args: RotateArgs) -> Result<()> {
    let pass = rotate_in_place(&PlaintextPassStore, &args.pass)?;
    print!("{}", rotation_report(&args.pass, &pass));
    Ok(())
}

fn rotation_report(pass_path: &Path, pass: &Pass) -> String {
    format!(
        "Pass file: {}\nNonce: {}\nRoot: {}\nNullifier: {}\n",
        pass_path.display(),
        pass.nonce,
        to_hex(&pass.root),
        to_hex(&pass.nullifier)
    )
}

fn prove(config: &Config, args: ProveArgs) -> Result<()> {
    let pass = PlaintextPassStore.load(&args.pass)?;
    let amount = scale_amount(&args.amount)?;
    let out = args.out.unwrap_or_else(|| config.proving.calldata_output.clone());

    let mut ledger = if config.ledger.enabled {
        let ledger = NullifierLedger::open(&config.ledger.path)?
            .with_lock_timeout(config.storage.lock_timeout());
        ledger.ensure_unused(&pass.nullifier)?;
        Some(ledger)
    } else {
        None
    };

    let proving_key = load_proving_key(&config.proving.keys_dir, pass.depth())?;

    tracing::info!(
        pass = %args.pass.display(),
        nonce = pass.nonce,
        depth = pass.depth(),
        "proving pass"
    );
    let job = ProofJob::spawn(Arc::new(proving_key), pass.clone(), poseidon_suite()?)?;
    let result = job.join()?;
    println!("publicSignals order OK: [root, nullifier, borrower, nonce]");

    if config.proving.verify_after_prove && !args.no_verify {
        let vk = load_verifying_key(&config.proving.keys_dir, pass.depth())?;
        if !verify_pass(&vk, &result.proof, &pass.public_inputs())? {
            return Err(PassError::Verification("fresh proof does not verify".into()).into());
        }
        tracing::debug!("local verification passed");
    }

    let calldata = ProofCalldata::new(&amount, &pass.public_inputs(), &result.proof);
    if let Some(ledger) = ledger.as_mut() {
        ledger.record(&pass.nullifier)?;
    }
    calldata.save(&out)?;

    println!("Wrote calldata: {}", out.display());
    println!("Amount: {}", calldata.amount);
    println!("Root: {}", calldata.root);
    println!("Nullifier: {}", calldata.nullifier);
    println!("Nonce: {}", calldata.nonce);
    Ok(())
}

fn verify(config: &Config, args: VerifyArgs) -> Result<()> {
    let calldata = ProofCalldata::load(&args.calldata)?;

    let (borrower, pass_depth) = match (&args.borrower, &args.pass) {
        (Some(borrower), _) => (borrower.parse::<Address>()?, None),
        (None, Some(path)) => {
            let pass = PlaintextPassStore.load(path)?;
            (pass.borrower, Some(pass.depth()))
        }
        (None, None) => bail!("either --borrower or --pass is required"),
    };
    let depth = args.depth.or(pass_depth).unwrap_or(config.tree.depth);

    let vk = load_verifying_key(&config.proving.keys_dir, depth)?;
    if !verify_calldata(&vk, &calldata, borrower.to_field())? {
        return Err(PassError::Verification(format!(
            "{} does not verify for borrower {}",
            args.calldata.display(),
            borrower
        ))
        .into());
    }

    println!("Proof valid for borrower {}", borrower);
    println!("Root: {}", calldata.root);
    println!("Nullifier: {}", calldata.nullifier);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use zkpass_prover::{rotate, MemoryLeafStore};

    #[test]
    fn test_rotation_report_lists_root_and_nullifier() {
        let mut rng = StdRng::seed_from_u64(11);
        let issuer = Issuer::new(MemoryLeafStore::new(), 4);
        let pass = issuer.issue(Address::from_bytes([7; 20]), &mut rng).unwrap();
        let rotated = rotate(&pass).unwrap();

        let report = rotation_report(Path::new("pass.json"), &rotated);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Pass file: pass.json".to_string(),
                "Nonce: 1".to_string(),
                format!("Root: {}", to_hex(&pass.root)),
                format!("Nullifier: {}", to_hex(&rotated.nullifier)),
            ]
        );
    }
}
