use std::{
    fs,
    time::{Duration, Instant},
};

use tracing::info;

use utils::{journal, Call, FakeApprover, FakeRunner, UnlaunchableRunner};

use keyrot::{
    FailurePolicy, FileSecret, FilesystemKeys, InMemorySecret, KeyList, Outcome, Pacing,
    RotateError, Rotator, RunSummary, SecretError, Step,
};

#[tokio::test]
async fn test_rotates_keys_in_order() -> eyre::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempfile::tempdir()?;
    let keys_path = dir.path().join("accs.txt");
    let secret_path = dir.path().join(".secret");
    fs::write(&keys_path, "keyA\n  keyB  \nkeyC")?;

    let calls = journal();
    let rotator = Rotator::new(
        FilesystemKeys::new(&keys_path),
        FakeApprover::new(calls.clone()).reading(&secret_path),
        FakeRunner::new(calls.clone()).reading(&secret_path),
    )
    .with_pacing(Pacing::None);

    let summary = rotator.run(|| FileSecret::open(&secret_path)).await?;
    info!(?summary, "Rotation finished");

    let seen = |key: &str| Some(key.to_owned());
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            Call::Approve { key: "keyA".into(), secret: seen("keyA") },
            Call::Test { secret: seen("keyA") },
            Call::Approve { key: "keyB".into(), secret: seen("keyB") },
            Call::Test { secret: seen("keyB") },
            Call::Approve { key: "keyC".into(), secret: seen("keyC") },
            Call::Test { secret: seen("keyC") },
        ]
    );
    assert_eq!(
        summary,
        RunSummary { keys: 3, approvals: 3, test_runs: 3, approval_failures: 0, test_failures: 0 }
    );
    assert_eq!(fs::read_to_string(&secret_path)?, "keyC");

    Ok(())
}

#[tokio::test]
async fn test_shorter_key_leaves_no_trailing_bytes() -> eyre::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempfile::tempdir()?;
    let secret_path = dir.path().join(".secret");
    fs::write(&secret_path, "stale-content-longer-than-any-key")?;

    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["0xaaaaaaaaaaaaaaaa", "0xbb", " 0xc "]),
        FakeApprover::new(calls.clone()).reading(&secret_path),
        FakeRunner::new(calls.clone()),
    )
    .with_pacing(Pacing::None);

    rotator.run(|| FileSecret::open(&secret_path)).await?;

    let observed: Vec<_> = calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|call| match call {
            Call::Approve { secret, .. } => secret.clone(),
            Call::Test { .. } => None,
        })
        .collect();
    assert_eq!(observed, ["0xaaaaaaaaaaaaaaaa", "0xbb", "0xc"]);

    Ok(())
}

#[tokio::test]
async fn test_empty_key_list_changes_nothing() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let keys_path = dir.path().join("accs.txt");
    let secret_path = dir.path().join(".secret");
    fs::write(&keys_path, "")?;
    fs::write(&secret_path, "previous key\n")?;

    let calls = journal();
    let rotator = Rotator::new(
        FilesystemKeys::new(&keys_path),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()),
    );

    let start = Instant::now();
    let summary = rotator.run(|| FileSecret::open(&secret_path)).await?;

    assert_eq!(summary, RunSummary::default());
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(fs::read_to_string(&secret_path)?, "previous key\n");
    // no iteration, so no pause either
    assert!(start.elapsed() < Duration::from_secs(1));

    Ok(())
}

#[tokio::test]
async fn test_missing_key_file_aborts_before_opening_secret() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let keys_path = dir.path().join("missing.txt");

    let calls = journal();
    let rotator = Rotator::new(
        FilesystemKeys::new(&keys_path),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()),
    );

    let mut opened = false;
    let res = rotator
        .run(|| {
            opened = true;
            Ok(InMemorySecret::default())
        })
        .await;

    assert!(matches!(res, Err(RotateError::Keys(_))));
    assert!(!opened);
    assert!(calls.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_secret_open_failure_aborts_before_any_step() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let secret_path = dir.path().join("no-such-dir").join(".secret");

    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA"]),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()),
    );

    let res = rotator.run(|| FileSecret::open(&secret_path)).await;

    assert!(matches!(res, Err(RotateError::Secret(SecretError::Open { .. }))));
    assert!(calls.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_steps_are_ignored_by_default() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "keyB"]),
        FakeApprover::new(calls.clone()).with_outcomes([Outcome::Failed { code: Some(1) }]),
        FakeRunner::new(calls.clone()).with_outcomes([
            Outcome::Failed { code: Some(2) },
            Outcome::Failed { code: None },
        ]),
    )
    .with_pacing(Pacing::None);

    let mut secret = InMemorySecret::default();
    let slot = &mut secret;
    let summary = rotator.run(move || Ok(slot)).await?;

    // the test step still runs for the key whose approval failed
    assert_eq!(calls.lock().unwrap().len(), 4);
    assert_eq!(
        summary,
        RunSummary { keys: 2, approvals: 2, test_runs: 2, approval_failures: 1, test_failures: 2 }
    );
    assert_eq!(secret.history(), ["keyA", "keyB"]);

    Ok(())
}

#[tokio::test]
async fn test_stop_policy_skips_test_step_and_remaining_keys() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "keyB", "keyC"]),
        FakeApprover::new(calls.clone())
            .with_outcomes([Outcome::Success, Outcome::Failed { code: Some(7) }]),
        FakeRunner::new(calls.clone()),
    )
    .with_policy(FailurePolicy::Stop)
    .with_pacing(Pacing::None);

    let mut secret = InMemorySecret::default();
    let slot = &mut secret;
    let res = rotator.run(move || Ok(slot)).await;

    match res {
        Err(RotateError::StepFailed { step: Step::Approve, index: 1, code: Some(7) }) => {}
        other => eyre::bail!("Expected approval failure on second key, got {other:?}"),
    }
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            Call::Approve { key: "keyA".into(), secret: None },
            Call::Test { secret: None },
            Call::Approve { key: "keyB".into(), secret: None },
        ]
    );
    // the slot keeps the key that was being processed
    assert_eq!(secret.current(), "keyB");

    Ok(())
}

#[tokio::test]
async fn test_retry_policy_reruns_failed_step() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA"]),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()).with_outcomes([
            Outcome::Failed { code: Some(1) },
            Outcome::Failed { code: Some(1) },
            Outcome::Success,
        ]),
    )
    .with_policy(FailurePolicy::Retry(2))
    .with_pacing(Pacing::None);

    let summary = rotator.run(|| Ok(InMemorySecret::default())).await?;

    assert_eq!(summary.test_runs, 3);
    assert_eq!(summary.test_failures, 2);
    assert_eq!(summary.approvals, 1);

    Ok(())
}

#[tokio::test]
async fn test_retry_policy_gives_up() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "keyB"]),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()).with_outcomes([
            Outcome::Failed { code: Some(1) },
            Outcome::Failed { code: Some(1) },
        ]),
    )
    .with_policy(FailurePolicy::Retry(1))
    .with_pacing(Pacing::None);

    let res = rotator.run(|| Ok(InMemorySecret::default())).await;

    assert!(matches!(res, Err(RotateError::StepFailed { step: Step::Test, index: 0, .. })));
    assert_eq!(calls.lock().unwrap().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_launch_error_aborts_whatever_the_policy() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "keyB"]),
        FakeApprover::new(calls.clone()),
        UnlaunchableRunner,
    )
    .with_pacing(Pacing::None);

    let res = rotator.run(|| Ok(InMemorySecret::default())).await;

    assert!(matches!(res, Err(RotateError::Launch(_))));
    // the first key was approved, the second was never reached
    assert_eq!(calls.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_rerun_produces_same_secret_states() -> eyre::Result<()> {
    let keys = KeyList::from_lines(["k1", " k2", "k3 ", "", "k1"]);

    let mut histories = Vec::new();
    for _ in 0..2 {
        let calls = journal();
        let rotator = Rotator::new(
            keys.clone(),
            FakeApprover::new(calls.clone()),
            FakeRunner::new(calls.clone()),
        )
        .with_pacing(Pacing::None);

        let mut secret = InMemorySecret::default();
        let slot = &mut secret;
        rotator.run(move || Ok(slot)).await?;
        histories.push(secret.history().to_vec());
    }

    assert_eq!(histories[0], ["k1", "k2", "k3", "", "k1"]);
    assert_eq!(histories[0], histories[1]);

    Ok(())
}

#[tokio::test]
async fn test_pause_after_every_key() -> eyre::Result<()> {
    let calls = journal();
    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "keyB", "keyC"]),
        FakeApprover::new(calls.clone()),
        FakeRunner::new(calls.clone()),
    )
    .with_pacing(Pacing::Fixed(Duration::from_millis(40)));

    let start = Instant::now();
    rotator.run(|| Ok(InMemorySecret::default())).await?;

    // three pauses, including the one after the last key
    assert!(start.elapsed() >= Duration::from_millis(120));

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_commands_see_secret_file() -> eyre::Result<()> {
    use keyrot::{CommandApprover, CommandTestRunner, ExternalCommand};

    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempfile::tempdir()?;
    let secret_path = dir.path().join(".secret");
    let log_path = dir.path().join("calls.log");
    let secret = secret_path.display().to_string();
    let log = log_path.display().to_string();

    // approval logs its argument and the file content, the test step logs the file content
    let approve_script =
        format!(r#"printf 'approve %s %s\n' "$0" "$(cat '{secret}')" >> '{log}'"#);
    let test_script = format!(r#"printf 'test %s\n' "$(cat '{secret}')" >> '{log}'"#);

    let rotator = Rotator::new(
        KeyList::from_lines(["keyA", "  keyB  "]),
        CommandApprover::new(ExternalCommand::new("sh", ["-c".to_owned(), approve_script])),
        CommandTestRunner::new(ExternalCommand::new("sh", ["-c".to_owned(), test_script])),
    )
    .with_pacing(Pacing::None);

    let summary = rotator.run(|| FileSecret::open(&secret_path)).await?;

    assert_eq!(summary.keys, 2);
    assert_eq!(
        fs::read_to_string(&log_path)?,
        "approve keyA keyA\ntest keyA\napprove keyB keyB\ntest keyB\n"
    );

    Ok(())
}
