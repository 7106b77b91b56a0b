use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use keyrot::{
    CommandApprover, CommandTestRunner, ExternalCommand, FailurePolicy, FileSecret,
    FilesystemKeys, Pacing, Rotator,
};

#[derive(Debug, Parser)]
#[clap(about = "Rotate account keys through a secret file and run external tooling for each")]
struct CliOpts {
    /// File with one account key per line.
    #[clap(long, env = "KEYROT_KEYS_PATH", default_value = "accs.txt")]
    pub keys_path: PathBuf,
    /// Secret file rewritten with the current key before each step.
    #[clap(long, env = "KEYROT_SECRET_PATH", default_value = ".secret")]
    pub secret_path: PathBuf,
    /// Interpreter used to run the approval script.
    #[clap(long, env = "KEYROT_APPROVE_PROGRAM", default_value = "python3")]
    pub approve_program: String,
    /// Approval script, invoked with the current key as its only argument.
    #[clap(long, env = "KEYROT_APPROVE_SCRIPT", default_value = "./scripts/approve.py")]
    pub approve_script: PathBuf,
    /// Test command run after each approval.
    #[clap(long, env = "KEYROT_TEST_PROGRAM", default_value = "truffle")]
    pub test_program: String,
    /// Arguments of the test command, space separated.
    #[clap(
        long,
        env = "KEYROT_TEST_ARGS",
        value_delimiter = ' ',
        num_args = 1..,
        default_values = ["exec", "./test/staking-test.js"]
    )]
    pub test_args: Vec<String>,
    /// Pause after each key, in milliseconds. Zero disables it.
    #[clap(long, env = "KEYROT_INTERVAL_MS", default_value = "1000")]
    pub interval_ms: u64,
    /// What to do when a command exits unsuccessfully: `continue`, `stop` or `retry:<n>`.
    #[clap(long, env = "KEYROT_ON_FAILURE", default_value = "continue")]
    pub on_failure: FailurePolicy,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let opts = CliOpts::parse();

    let rotator = Rotator::new(
        FilesystemKeys::new(opts.keys_path),
        CommandApprover::script(opts.approve_program, opts.approve_script),
        CommandTestRunner::new(ExternalCommand::new(opts.test_program, opts.test_args)),
    )
    .with_policy(opts.on_failure)
    .with_pacing(Pacing::from_millis(opts.interval_ms));

    let secret_path = opts.secret_path;
    let summary = rotator.run(|| FileSecret::open(secret_path)).await?;

    info!(
        keys = summary.keys,
        approval_failures = summary.approval_failures,
        test_failures = summary.test_failures,
        "Done"
    );

    Ok(())
}
