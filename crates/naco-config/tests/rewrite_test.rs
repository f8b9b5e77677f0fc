//! Transactional rewrite and commit tests over real files

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use naco_config::{
    commit_path, objdef_engine, CommitOutcome, ConfigFile, TypeRegistry, WriteStrategy,
    BACKUP_SUFFIX, TRANSACTION_SUFFIX,
};
use naco_expr::Expression;
use tempfile::TempDir;

const SAMPLE: &str = "# fleet configuration\n\ndefine host {\n    host_name   foo\n    register    1\n}\n\n# trailing note\ndefine host {\n    host_name   bar\n}\n";

fn write_sample(dir: &Path) -> PathBuf {
    let path = dir.join("hosts.cfg");
    fs::write(&path, SAMPLE).expect("failed to write sample");
    path
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Push a file's mtime into the past so ordering checks are deterministic
fn age_file(path: &Path, seconds: u64) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("failed to open for aging");
    file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
        .expect("failed to set mtime");
}

#[test]
fn test_all_keep_decisions_leave_filesystem_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Overwrite).unwrap();
    while let Some(_objdef) = session.read_object().unwrap() {
        session.keep().unwrap();
    }
    assert!(!session.updated());
    assert_eq!(session.finish().unwrap(), None);

    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "no side files may remain");
}

#[test]
fn test_replace_rewrites_only_the_selected_block() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let engine = objdef_engine();
    let filter = Expression::compile("host_name == 'foo'").unwrap();
    let update = Expression::compile_update("register = 0").unwrap();

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Overwrite).unwrap();
    while let Some(mut objdef) = session.read_object().unwrap() {
        if engine.eval(&filter, &objdef).unwrap().is_truthy() {
            engine.eval_update(&update, &mut objdef).unwrap();
            session.replace(&objdef).unwrap();
        } else {
            session.keep().unwrap();
        }
    }
    assert!(session.updated());
    assert_eq!(session.finish().unwrap(), Some(path.clone()));

    let rewritten = fs::read_to_string(&path).unwrap();
    // The edited block is re-normalized...
    assert!(rewritten.contains("    host_name                      foo\n"));
    assert!(rewritten.contains("    register                       0\n"));
    // ...while everything around it is byte-identical to the source
    assert!(rewritten.starts_with("# fleet configuration\n\n"));
    assert!(rewritten.contains("\n\n# trailing note\ndefine host {\n    host_name   bar\n}\n"));
}

#[test]
fn test_delete_drops_the_block_but_keeps_surrounding_text() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Overwrite).unwrap();
    while let Some(objdef) = session.read_object().unwrap() {
        if objdef.identifier().as_deref() == Some("foo") {
            session.delete().unwrap();
        } else {
            session.keep().unwrap();
        }
    }
    session.finish().unwrap();

    let rewritten = fs::read_to_string(&path).unwrap();
    assert_eq!(
        rewritten,
        "# fleet configuration\n\n\n# trailing note\ndefine host {\n    host_name   bar\n}\n"
    );
}

#[test]
fn test_backup_strategy_keeps_the_original() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Backup).unwrap();
    while let Some(objdef) = session.read_object().unwrap() {
        if objdef.identifier().as_deref() == Some("bar") {
            session.delete().unwrap();
        } else {
            session.keep().unwrap();
        }
    }
    session.finish().unwrap();

    let backup = with_suffix(&path, BACKUP_SUFFIX);
    assert_eq!(fs::read_to_string(backup).unwrap(), SAMPLE);
    assert!(!fs::read_to_string(&path).unwrap().contains("bar"));
}

#[test]
fn test_transaction_strategy_leaves_original_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Transaction)
            .unwrap();
    while let Some(objdef) = session.read_object().unwrap() {
        if objdef.identifier().as_deref() == Some("foo") {
            session.delete().unwrap();
        } else {
            session.keep().unwrap();
        }
    }
    let written = session.finish().unwrap().unwrap();

    assert_eq!(written, with_suffix(&path, TRANSACTION_SUFFIX));
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    assert!(!fs::read_to_string(&written).unwrap().contains("foo"));
}

#[test]
fn test_transaction_sessions_compose() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let engine = objdef_engine();

    for update_text in ["contacts += 'ops'", "contacts += 'noc'"] {
        let update = Expression::compile_update(update_text).unwrap();
        let mut session =
            ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Transaction)
                .unwrap();
        while let Some(mut objdef) = session.read_object().unwrap() {
            if objdef.identifier().as_deref() == Some("foo") {
                engine.eval_update(&update, &mut objdef).unwrap();
                session.replace(&objdef).unwrap();
            } else {
                session.keep().unwrap();
            }
        }
        session.finish().unwrap();
    }

    // The second session read the pending transaction file, so both edits
    // are present in it and the original is still pristine.
    let transaction = with_suffix(&path, TRANSACTION_SUFFIX);
    let pending = fs::read_to_string(&transaction).unwrap();
    assert!(pending.contains("ops,noc"));
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

#[test]
fn test_dropped_session_removes_side_file() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    {
        let mut session =
            ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Overwrite)
                .unwrap();
        let objdef = session.read_object().unwrap().unwrap();
        session.replace(&objdef).unwrap();
        // Dropped without finish()
    }

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["hosts.cfg".to_string()]);
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

#[test]
fn test_commit_promotes_newer_transaction() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let transaction = with_suffix(&path, TRANSACTION_SUFFIX);
    fs::write(&transaction, "define host {\n    host_name edited\n}\n").unwrap();
    age_file(&path, 3600);

    assert_eq!(commit_path(&path, true).unwrap(), CommitOutcome::Promoted);
    assert!(fs::read_to_string(&path).unwrap().contains("edited"));
    assert!(!transaction.exists());
}

#[test]
fn test_commit_skips_when_original_is_newer() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let transaction = with_suffix(&path, TRANSACTION_SUFFIX);
    fs::write(&transaction, "define host {\n    host_name edited\n}\n").unwrap();
    age_file(&transaction, 3600);

    assert_eq!(
        commit_path(&path, true).unwrap(),
        CommitOutcome::SkippedOriginalNewer
    );
    // Original untouched, transaction file still pending
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    assert!(transaction.exists());
}

#[test]
fn test_commit_with_guard_disabled_always_promotes() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let transaction = with_suffix(&path, TRANSACTION_SUFFIX);
    fs::write(&transaction, "define host {\n    host_name edited\n}\n").unwrap();
    age_file(&transaction, 3600);

    assert_eq!(commit_path(&path, false).unwrap(), CommitOutcome::Promoted);
    assert!(fs::read_to_string(&path).unwrap().contains("edited"));
}

#[test]
fn test_commit_without_transaction_file_is_a_skip() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());

    assert_eq!(
        commit_path(&path, true).unwrap(),
        CommitOutcome::NoTransaction
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

#[test]
fn test_augmented_update_against_coerced_directive() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(dir.path());
    let engine = objdef_engine();
    // `*=` falls back to plain arithmetic; `register` coerces to an integer
    let update = Expression::compile_update("register *= 3").unwrap();

    let mut session =
        ConfigFile::open_update(&path, TypeRegistry::builtin(), WriteStrategy::Overwrite).unwrap();
    while let Some(mut objdef) = session.read_object().unwrap() {
        if objdef.identifier().as_deref() == Some("foo") {
            engine.eval_update(&update, &mut objdef).unwrap();
            session.replace(&objdef).unwrap();
        } else {
            session.keep().unwrap();
        }
    }
    session.finish().unwrap();

    assert!(fs::read_to_string(&path)
        .unwrap()
        .contains("    register                       3\n"));
}
