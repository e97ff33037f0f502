mod common;

use avsweep::scheduler::{MemoryMarkerStore, RunOutcome, ScanPolicy, Scheduler, SkipReason};
use avsweep::{Error, Quarantine, ScanEngine, SilentReporter};
use chrono::{TimeZone, Utc};
use common::{write_file, FakeEngine, FixedPower, RecordingNotifier, Response};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn hourly() -> ScanPolicy {
    ScanPolicy {
        min_interval: Some(chrono::Duration::seconds(3_600)),
        ..ScanPolicy::default()
    }
}

#[test]
fn test_battery_skip_has_no_side_effects() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("data/a.txt"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let marker = MemoryMarkerStore::default();
    let scheduler = Scheduler::new(FixedPower(false), &marker);

    let policy = ScanPolicy {
        require_mains_power: true,
        ..ScanPolicy::default()
    };
    let outcome = scheduler
        .run(&engine, &policy, &[tmp.path().join("data")], &SilentReporter)
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Skipped(SkipReason::OnBattery)));
    assert_eq!(detector.calls(), 0);
    assert_eq!(marker.get(), None);
}

#[test]
fn test_second_run_in_succession_is_skipped() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("data/a.txt"), "x");
    let base_dirs = vec![tmp.path().join("data")];

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let marker = MemoryMarkerStore::default();
    let scheduler = Scheduler::new(FixedPower(true), &marker);

    let first = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let outcome = scheduler
        .run_at(&engine, &hourly(), &base_dirs, &SilentReporter, first)
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(marker.get(), Some(first));

    let second = first + chrono::Duration::seconds(1);
    let outcome = scheduler
        .run_at(&engine, &hourly(), &base_dirs, &SilentReporter, second)
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Skipped(SkipReason::RecentRun { last_run }) if last_run == first
    ));
    assert_eq!(detector.calls(), 1);
    assert_eq!(marker.get(), Some(first));
}

#[test]
fn test_marker_records_start_time_not_end_time() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("data/a.txt"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let marker = MemoryMarkerStore::default();
    let scheduler = Scheduler::new(FixedPower(true), &marker);

    let started_at = Utc.timestamp_opt(1_000, 0).unwrap();
    scheduler
        .run_at(
            &engine,
            &ScanPolicy::default(),
            &[tmp.path().join("data")],
            &SilentReporter,
            started_at,
        )
        .unwrap();
    assert_eq!(marker.get(), Some(started_at));
}

#[test]
fn test_each_directory_is_submitted_separately() {
    let tmp = tempdir().unwrap();
    let a1 = write_file(&tmp.path().join("one/a1.txt"), "x");
    let a2 = write_file(&tmp.path().join("one/nested/a2.txt"), "x");
    write_file(&tmp.path().join("one/empty.txt"), "");
    let b1 = write_file(&tmp.path().join("two/b1.txt"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let scheduler = Scheduler::new(FixedPower(true), MemoryMarkerStore::default());

    let outcome = scheduler
        .run(
            &engine,
            &ScanPolicy::default(),
            &[tmp.path().join("one"), tmp.path().join("two")],
            &SilentReporter,
        )
        .unwrap();

    let mut submissions = detector.submissions();
    assert_eq!(submissions.len(), 2);
    submissions[0].sort();
    assert_eq!(submissions[0], vec![a1, a2]);
    assert_eq!(submissions[1], vec![b1]);

    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.files_scanned(), 3);
            assert_eq!(summary.detections(), 0);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_nested_base_directories_are_scanned_once() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("home/docs/a.txt"), "x");
    write_file(&tmp.path().join("home/b.txt"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let scheduler = Scheduler::new(FixedPower(true), MemoryMarkerStore::default());

    scheduler
        .run(
            &engine,
            &ScanPolicy::default(),
            &[tmp.path().join("home/docs"), tmp.path().join("home")],
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(detector.calls(), 1);
    assert_eq!(detector.submissions()[0].len(), 2);
}

#[test]
fn test_empty_directory_skips_engine_but_completes() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let marker = MemoryMarkerStore::default();
    let scheduler = Scheduler::new(FixedPower(true), &marker);

    let outcome = scheduler
        .run(&engine, &ScanPolicy::default(), &[tmp.path().join("empty")], &SilentReporter)
        .unwrap();

    assert_eq!(detector.calls(), 0);
    assert!(marker.get().is_some());
    match outcome {
        RunOutcome::Completed(summary) => assert!(summary.directories[0].result.is_none()),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_does_not_abort_the_run() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let data = tmp.path().join("data");
    let open = write_file(&data.join("open.txt"), "x");
    let locked = data.join("locked");
    write_file(&locked.join("secret.txt"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let marker = MemoryMarkerStore::default();
    let scheduler = Scheduler::new(FixedPower(true), &marker);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let still_readable = fs::read_dir(&locked).is_ok();
    let outcome = scheduler.run(&engine, &ScanPolicy::default(), &[data], &SilentReporter);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if still_readable {
        return;
    }
    assert!(matches!(outcome.unwrap(), RunOutcome::Completed(_)));
    assert_eq!(detector.submissions(), vec![vec![open]]);
    assert!(marker.get().is_some());
}

#[test]
fn test_engine_failure_withholds_marker_update() {
    let tmp = tempdir().unwrap();
    let infected = write_file(&tmp.path().join("one/eicar.com"), "X5O!P%@AP");
    write_file(&tmp.path().join("two/b.txt"), "x");
    let quarantine_root = tmp.path().join("q");

    let detector = FakeEngine::new(vec![
        Response::Infected(vec![infected.clone()]),
        Response::Fail(2),
    ]);
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(&quarantine_root));
    let previous = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    let marker = MemoryMarkerStore::new(Some(previous));
    let scheduler = Scheduler::new(FixedPower(true), &marker);

    let err = scheduler
        .run(
            &engine,
            &ScanPolicy::default(),
            &[tmp.path().join("one"), tmp.path().join("two")],
            &SilentReporter,
        )
        .unwrap_err();

    assert!(matches!(err, Error::EngineFailure { code: Some(2), .. }));
    assert_eq!(marker.get(), Some(previous));
    // The first directory's result stands.
    assert!(!infected.exists());
    assert!(quarantine_root.join("eicar.com").exists());
}

#[test]
fn test_modified_within_limits_candidates() {
    let tmp = tempdir().unwrap();
    let fresh = write_file(&tmp.path().join("data/fresh.txt"), "x");
    let stale = write_file(&tmp.path().join("data/stale.txt"), "x");
    fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(30 * 86_400))
        .unwrap();

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let scheduler = Scheduler::new(FixedPower(true), MemoryMarkerStore::default());

    let policy = ScanPolicy {
        modified_within: Some(Duration::from_secs(7 * 86_400)),
        ..ScanPolicy::default()
    };
    scheduler
        .run(&engine, &policy, &[tmp.path().join("data")], &SilentReporter)
        .unwrap();

    assert_eq!(detector.submissions(), vec![vec![fresh]]);
}

#[test]
fn test_exclude_patterns_apply_to_full_scans() {
    let tmp = tempdir().unwrap();
    let kept = write_file(&tmp.path().join("data/kept.txt"), "x");
    write_file(&tmp.path().join("data/cache/blob.bin"), "x");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let scheduler = Scheduler::new(FixedPower(true), MemoryMarkerStore::default())
        .with_exclude_patterns(vec!["*/cache".to_string()]);

    scheduler
        .run(&engine, &ScanPolicy::default(), &[tmp.path().join("data")], &SilentReporter)
        .unwrap();

    assert_eq!(detector.submissions(), vec![vec![kept]]);
}

#[test]
fn test_file_marker_survives_between_schedulers() {
    let tmp = tempdir().unwrap();
    write_file(&tmp.path().join("data/a.txt"), "x");
    let marker_path: PathBuf = tmp.path().join("state/last_scan");

    let detector = FakeEngine::default();
    let notifier = RecordingNotifier::default();
    let engine = ScanEngine::new(&detector, &notifier, Quarantine::new(tmp.path().join("q")));
    let base_dirs = vec![tmp.path().join("data")];

    let first = Scheduler::new(
        FixedPower(true),
        avsweep::scheduler::FileMarkerStore::new(&marker_path),
    );
    first.run(&engine, &hourly(), &base_dirs, &SilentReporter).unwrap();
    assert!(marker_path.exists());

    let second = Scheduler::new(
        FixedPower(true),
        avsweep::scheduler::FileMarkerStore::new(&marker_path),
    );
    let outcome = second.run(&engine, &hourly(), &base_dirs, &SilentReporter).unwrap();
    assert!(matches!(outcome, RunOutcome::Skipped(SkipReason::RecentRun { .. })));
    assert_eq!(detector.calls(), 1);
}
