use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

fn ncd_cmd(db_path: &std::path::Path) -> Command {
    let bin_path = env!("CARGO_BIN_EXE_ncd");
    let mut cmd = Command::new(PathBuf::from(bin_path));
    cmd.arg("--db-path").arg(db_path);
    cmd
}

#[test]
fn init_migrate_seed_demo_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("neurostore.db");

    ncd_cmd(&db_path).arg("init").assert().success();
    ncd_cmd(&db_path).arg("migrate").assert().success();
    ncd_cmd(&db_path).arg("seed").assert().success();
    ncd_cmd(&db_path).args(["demo", "--count", "2"]).assert().success();

    let export_path = dir.path().join("export.json");
    ncd_cmd(&db_path).args(["export", export_path.to_str().unwrap(), "--format", "json"]).assert().success();

    let exported = std::fs::read_to_string(&export_path).unwrap();
    assert!(exported.contains("SYNTH_PATIENT_0001"));
}

#[test]
fn import_csv_bundle_then_export_csv() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("neurostore.db");
    ncd_cmd(&db_path).arg("migrate").assert().success();

    let csv_path = dir.path().join("bundle.csv");
    std::fs::write(
        &csv_path,
        "Patient,Encounter,Start,End,Kind,Heart Rate\n\
         patient_cd,encounter_num,start_date,end_date,visit_kind,VITAL:HEART_RATE\n\
         DEMO_PATIENT_01,ENC1,2024-03-15,,Outpatient,72\n",
    )
    .unwrap();

    ncd_cmd(&db_path).args(["import", csv_path.to_str().unwrap(), "--strategy", "skip"]).assert().success();

    let export_path = dir.path().join("export.csv");
    ncd_cmd(&db_path).args(["export", export_path.to_str().unwrap(), "--format", "csv"]).assert().success();
    let exported = std::fs::read_to_string(&export_path).unwrap();
    assert!(exported.contains("DEMO_PATIENT_01"));
}

#[test]
fn reset_drops_and_reapplies_migrations() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("neurostore.db");
    ncd_cmd(&db_path).arg("migrate").assert().success();
    ncd_cmd(&db_path).args(["demo", "--count", "1"]).assert().success();

    ncd_cmd(&db_path).arg("reset").assert().success();

    let export_path = dir.path().join("export.json");
    ncd_cmd(&db_path).args(["export", export_path.to_str().unwrap(), "--format", "json"]).assert().success();
    let exported = std::fs::read_to_string(&export_path).unwrap();
    assert!(!exported.contains("SYNTH_PATIENT"));
}

#[test]
fn importing_a_malformed_file_exits_with_validation_error_code() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("neurostore.db");
    ncd_cmd(&db_path).arg("migrate").assert().success();

    let bad_path = dir.path().join("bad.json");
    std::fs::write(&bad_path, "{ not json").unwrap();

    ncd_cmd(&db_path).args(["import", bad_path.to_str().unwrap()]).assert().code(2);
}
