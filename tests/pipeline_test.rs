//! End-to-end runs of the extract and load step against an in-memory
//! warehouse and a temporary storage folder.

mod common;

use std::collections::HashSet;

use fitflow::discovery::list_local_files;
use fitflow::pipeline::{self, Disposal, FileOutcome};
use fitflow::{TableRef, WarehouseError};

use common::{
    corrupted_fit_bytes, fit_bytes, junk_bytes, ride, write_file, Failure, MemoryWarehouse,
};

fn target() -> TableRef {
    TableRef::new("fit_data", "fitfile_records").unwrap()
}

#[tokio::test]
async fn loads_only_files_missing_from_warehouse() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.fit", &fit_bytes(&ride(60)));
    write_file(dir.path(), "B.fit", &fit_bytes(&ride(120)));

    let warehouse = MemoryWarehouse::new();
    warehouse.seed(&target(), "A.fit", 60);

    let report = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    assert_eq!(report.local_files, 2);
    assert_eq!(report.loaded_files, 1);
    assert_eq!(report.candidates(), 1);
    assert_eq!(report.files[0].file_name, "B.fit");
    assert_eq!(
        report.files[0].outcome,
        FileOutcome::Loaded {
            rows: 120,
            table_id: "test-project.fit_data.fitfile_records".to_string(),
        }
    );
    assert_eq!(report.total_rows, 120);
    assert_eq!(report.to_string(), "Loaded 120 rows from 1 file(s).");

    let rows = warehouse.rows(&target());
    assert_eq!(rows.iter().filter(|r| r.file_name == "B.fit").count(), 120);
    assert!(rows
        .iter()
        .filter(|r| r.file_name == "B.fit")
        .all(|r| r.speed.is_some() && r.enhanced_speed.is_some()));
    assert_eq!(rows.iter().filter(|r| r.file_name == "A.fit").count(), 60);

    // Loaded files stay on disk
    assert!(dir.path().join("B.fit").exists());
}

#[tokio::test]
async fn rerun_after_load_finds_nothing_new() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.fit", &fit_bytes(&ride(30)));
    write_file(dir.path(), "B.fit", &fit_bytes(&ride(45)));

    let warehouse = MemoryWarehouse::new();
    let first = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();
    assert_eq!(first.total_rows, 75);
    assert_eq!(first.files_loaded(), 2);

    let second = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();
    assert_eq!(second.candidates(), 0);
    assert_eq!(second.total_rows, 0);
    assert_eq!(warehouse.rows(&target()).len(), 75);
}

#[tokio::test]
async fn missing_table_counts_as_nothing_loaded() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.fit", &fit_bytes(&ride(10)));

    let warehouse = MemoryWarehouse::new();
    let report = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    assert_eq!(report.loaded_files, 0);
    assert_eq!(report.total_rows, 10);
}

#[tokio::test]
async fn empty_file_is_deleted_without_load() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "C.fit", &fit_bytes(&[]));

    let warehouse = MemoryWarehouse::new();
    let report = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    assert_eq!(report.files[0].outcome, FileOutcome::RemovedEmpty);
    assert_eq!(report.files_removed(), 1);
    assert_eq!(report.total_rows, 0);
    assert!(!dir.path().join("C.fit").exists());
    assert!(warehouse.rows(&target()).is_empty());
}

#[tokio::test]
async fn corrupted_file_is_deleted_and_not_listed_again() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.fit", &corrupted_fit_bytes(&ride(20)));
    write_file(dir.path(), "good.fit", &fit_bytes(&ride(20)));

    let warehouse = MemoryWarehouse::new();
    let report = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    let bad = report.files.iter().find(|f| f.file_name == "bad.fit").unwrap();
    assert_eq!(bad.outcome, FileOutcome::RemovedCorrupted);
    assert_eq!(report.total_rows, 20);

    let local = list_local_files(dir.path()).unwrap();
    assert_eq!(local, HashSet::from(["good.fit".to_string()]));
}

#[tokio::test]
async fn unparsable_file_is_kept_and_retried() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "junk.fit", &junk_bytes());

    let warehouse = MemoryWarehouse::new();
    let first = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    assert!(matches!(first.files[0].outcome, FileOutcome::Failed(_)));
    assert_eq!(first.files_failed(), 1);
    assert!(dir.path().join("junk.fit").exists());

    let second = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();
    assert_eq!(second.candidates(), 1);
    assert_eq!(second.files[0].file_name, "junk.fit");
}

#[tokio::test]
async fn one_bad_file_does_not_stop_the_others() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.fit", &junk_bytes());
    write_file(dir.path(), "b.fit", &fit_bytes(&[]));
    write_file(dir.path(), "c.fit", &corrupted_fit_bytes(&ride(5)));
    write_file(dir.path(), "d.fit", &fit_bytes(&ride(7)));

    let warehouse = MemoryWarehouse::new();
    let report = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap();

    assert_eq!(report.candidates(), 4);
    assert_eq!(report.files_failed(), 1);
    assert_eq!(report.files_removed(), 2);
    assert_eq!(report.files_loaded(), 1);
    assert_eq!(report.to_string(), "Loaded 7 rows from 1 file(s).");
}

#[tokio::test]
async fn quarantine_keeps_disposed_files() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let quarantine = tempfile::tempdir().unwrap();
    write_file(dir.path(), "C.fit", &fit_bytes(&[]));
    write_file(dir.path(), "bad.fit", &corrupted_fit_bytes(&ride(3)));

    let warehouse = MemoryWarehouse::new();
    let disposal = Disposal::Quarantine(quarantine.path().to_path_buf());
    let report = pipeline::run(&warehouse, dir.path(), &target(), &disposal)
        .await
        .unwrap();

    assert_eq!(report.files_removed(), 2);
    assert!(list_local_files(dir.path()).unwrap().is_empty());
    assert!(quarantine.path().join("C.fit").exists());
    assert!(quarantine.path().join("bad.fit").exists());
}

#[tokio::test]
async fn discovery_failure_aborts_the_run() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.fit", &fit_bytes(&ride(5)));

    let warehouse = MemoryWarehouse::failing(Failure::Discovery);
    let err = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<WarehouseError>(),
        Some(WarehouseError::Database(_))
    ));
    assert!(dir.path().join("A.fit").exists());
}

#[tokio::test]
async fn load_failure_aborts_the_run() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.fit", &fit_bytes(&ride(5)));

    let warehouse = MemoryWarehouse::failing(Failure::Load);
    let err = pipeline::run(&warehouse, dir.path(), &target(), &Disposal::Delete)
        .await
        .unwrap_err();

    assert!(err.downcast_ref::<WarehouseError>().is_some());
    assert!(dir.path().join("A.fit").exists());
}

#[tokio::test]
async fn missing_storage_folder_is_an_error() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MemoryWarehouse::new();

    let result = pipeline::run(
        &warehouse,
        &dir.path().join("absent"),
        &target(),
        &Disposal::Delete,
    )
    .await;
    assert!(result.is_err());
}
