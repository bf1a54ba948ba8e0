mod support;

use std::fs;
use std::path::PathBuf;

use error_lens::{LensConfig, LockPolicy, Session};
use feedback_store::feedback_path;

use support::{answer_all, generate, HostSpy};

fn config_in(data_dir: PathBuf) -> LensConfig {
    LensConfig {
        data_dir,
        lock_policy: LockPolicy::FeedbackUnlocks,
        ..LensConfig::default()
    }
}

#[test]
fn feedback_survives_a_new_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path().join("lens"));

    {
        let mut session = Session::from_config(&config).expect("first run starts empty");
        assert!(session.store().is_empty());

        let mut host = HostSpy::with_next_run_id(1);
        generate(&mut session, &mut host, "explanation");
        session.open_feedback_form().expect("opens");
        answer_all(&mut session, true);
        session.submit_feedback().expect("persists");
    }

    let path = feedback_path(&config.data_dir);
    let raw = fs::read_to_string(&path).expect("collection written");
    assert!(raw.contains("\"collection\": \"error_feedback\""));

    let reopened = Session::from_config(&config).expect("second run loads records");
    assert_eq!(reopened.store().len(), 1);
    assert_eq!(reopened.store().records()[0].snippet_name, "list_index.py");
    assert!(
        reopened.current_explanation().is_none(),
        "explanations are session scoped"
    );
}

#[test]
fn configured_seed_reaches_generation_jobs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LensConfig {
        seed: Some(7),
        ..config_in(dir.path().to_path_buf())
    };
    let mut session = Session::from_config(&config).expect("starts");
    let mut host = HostSpy::with_next_run_id(1);

    session.request_generation(&mut host).expect("starts");
    assert_eq!(host.started_jobs[0].options.seed, Some(7));
}

#[test]
fn corrupt_collection_fails_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path().to_path_buf());
    fs::write(feedback_path(&config.data_dir), "{ not json").expect("write");

    assert!(Session::from_config(&config).is_err());
}
