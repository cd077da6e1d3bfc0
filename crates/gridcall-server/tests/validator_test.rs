//! Validator flow tests against live Postgres and a scripted predicate
//! runtime.
//!
//! Run with `cargo test --features test-db`. The runtime script treats a
//! blob reading `good` as loadable and anything else as a
//! deserialization failure, which pins the invocation order: the blob
//! check happens before the result file is examined.

#![cfg(all(feature = "test-db", unix))]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use sqlx::PgPool;

use gridcall_server::store::{TaskStore, MIGRATOR};
use gridcall_server::validator::{self, predicate::PredicateRuntime, ExitCode, ValidatorArgs};

const RUNTIME_SCRIPT: &str = "case \"$1\" in\n\
    --check)\n\
      [ \"$(cat \"$2\")\" = good ] || { echo 'cannot deserialize' >&2; exit 1; }\n\
      exit 0 ;;\n\
    --init|--compare)\n\
      echo true ;;\n\
  esac";

fn fake_runtime_project() -> tempfile::TempDir {
    let project = tempfile::tempdir().unwrap();
    let bin = project.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let path = bin.join("predicate_runtime");
    std::fs::write(&path, format!("#!/bin/sh\n{RUNTIME_SCRIPT}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    project
}

async fn seed(pool: &PgPool, init_blob: &[u8], compare_blob: &[u8]) -> TaskStore {
    sqlx::query("CREATE TABLE workunit (id BIGINT PRIMARY KEY, name TEXT NOT NULL)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE result (id BIGINT PRIMARY KEY, workunitid BIGINT NOT NULL)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO workunit (id, name) VALUES (17, 'task-1')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO result (id, workunitid) VALUES (5, 17), (6, 17)")
        .execute(pool)
        .await
        .unwrap();

    let store = TaskStore::from_pool(pool.clone());
    store
        .create_task("task-1", b"call-spec", init_blob, compare_blob)
        .await
        .unwrap();
    store
}

fn write_result_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_corrupt_blob_faults_even_for_user_error_result(pool: PgPool) {
    let project = fake_runtime_project();
    let store = seed(&pool, b"garbage", b"good").await;
    let runtime = PredicateRuntime::new(project.path());

    let dir = tempfile::tempdir().unwrap();
    let file = write_result_file(dir.path(), "result", b"1ZeroDivisionError");

    // The blob check precedes the status short-circuit, so the verdict
    // is VALID_FUNC_ERROR, not the USER_ERROR acceptance.
    let code = validator::run(&store, &runtime, ValidatorArgs::Init { result_id: 5, file })
        .await
        .unwrap();
    assert_eq!(code, ExitCode::ValidFuncError);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_loadable_blob_accepts_user_error_result(pool: PgPool) {
    let project = fake_runtime_project();
    let store = seed(&pool, b"good", b"good").await;
    let runtime = PredicateRuntime::new(project.path());

    let dir = tempfile::tempdir().unwrap();
    let file = write_result_file(dir.path(), "result", b"1ZeroDivisionError");

    let code = validator::run(&store, &runtime, ValidatorArgs::Init { result_id: 5, file })
        .await
        .unwrap();
    assert_eq!(code, ExitCode::Accepted);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_success_result_runs_predicate(pool: PgPool) {
    let project = fake_runtime_project();
    let store = seed(&pool, b"good", b"good").await;
    let runtime = PredicateRuntime::new(project.path());

    let dir = tempfile::tempdir().unwrap();
    let file = write_result_file(dir.path(), "result", b"042");

    let code = validator::run(&store, &runtime, ValidatorArgs::Init { result_id: 5, file })
        .await
        .unwrap();
    assert_eq!(code, ExitCode::Accepted);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_corrupt_compare_blob_faults_before_files(pool: PgPool) {
    let project = fake_runtime_project();
    let store = seed(&pool, b"good", b"garbage").await;
    let runtime = PredicateRuntime::new(project.path());

    let dir = tempfile::tempdir().unwrap();
    let file_1 = write_result_file(dir.path(), "result_1", b"1boom");
    let file_2 = write_result_file(dir.path(), "result_2", b"1boom");

    let code = validator::run(
        &store,
        &runtime,
        ValidatorArgs::Compare {
            result_id_1: 5,
            file_1,
            result_id_2: 6,
            file_2,
        },
    )
    .await
    .unwrap();
    assert_eq!(code, ExitCode::ValidFuncError);
}
