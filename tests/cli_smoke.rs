use obis::config::Config;
use std::path::Path;
use std::process::{Command, Output};

fn obis(data_dir: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_obis");
    Command::new(exe)
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OBIS_DATA_DIR")
        .env_remove("OBIS_SEED")
        .output()
        .expect("spawn obis")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn init_then_grade_attendance_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");

    let out = obis(&data, &["init"]);
    assert!(out.status.success(), "init failed: {:?}", out);
    let config = Config::with_data_dir(&data);
    assert!(config.admin_path().exists());
    assert!(config.teacher_path().exists());

    let before = config.store().find(1001).unwrap().expect("seeded student");
    let course = before.records[0].course_code.clone();
    let teacher = before.records[0].teacher_id.to_string();

    let out = obis(
        &data,
        &[
            "grade", "--student", "1001", "--course", &course, "--teacher", &teacher,
            "--midterm", "80", "--final", "90",
        ],
    );
    assert!(out.status.success(), "grade failed: {:?}", out);

    let out = obis(
        &data,
        &[
            "absence", "--student", "1001", "--course", &course, "--teacher", &teacher,
            "--count", "2",
        ],
    );
    assert!(out.status.success(), "absence failed: {:?}", out);

    let after = config.store().find(1001).unwrap().unwrap();
    let record = after
        .records
        .iter()
        .find(|r| r.matches(&course, before.records[0].teacher_id))
        .unwrap();
    assert_eq!(record.midterm, Some(80));
    assert_eq!(record.final_score, Some(90));
    assert_eq!(record.legacy_grade, Some(86));
    assert_eq!(record.absences, Some(2));
    assert_eq!(record.schedule, before.records[0].schedule);

    let out = obis(&data, &["show", "--student", "1001"]);
    assert!(stdout(&out).contains("midterm=80"));

    let xlsx = dir.path().join("transcript.xlsx");
    let out = obis(&data, &["report", "--output", xlsx.to_str().unwrap()]);
    assert!(out.status.success(), "report failed: {:?}", out);
    assert!(xlsx.exists());
}

#[test]
fn login_checks_credentials_per_role() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    assert!(obis(&data, &["init"]).status.success());

    let ok = obis(
        &data,
        &["login", "--role", "admin", "--username", "admin", "--password", "admin123"],
    );
    assert!(ok.status.success());
    assert!(stdout(&ok).contains("admin"));

    let bad = obis(
        &data,
        &["login", "--role", "student", "--username", "ogr1", "--password", "wrong"],
    );
    assert!(!bad.status.success());
}

#[test]
fn enroll_appends_with_next_id() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    assert!(obis(&data, &["init"]).status.success());

    let out = obis(
        &data,
        &[
            "enroll", "--username", "yeni", "--password", "pw", "--first-name", "Yeni",
            "--last-name", "Ogrenci", "--email", "yeni@yuni.edu", "--courses", "3",
        ],
    );
    assert!(out.status.success(), "enroll failed: {:?}", out);

    let student = Config::with_data_dir(&data).store().find(1031).unwrap().unwrap();
    assert_eq!(student.username, "yeni");
    assert_eq!(student.records.len(), 3);

    let dup = obis(
        &data,
        &[
            "enroll", "--username", "yeni", "--password", "pw", "--first-name", "A",
            "--last-name", "B", "--email", "a@yuni.edu",
        ],
    );
    assert!(!dup.status.success());

    let bad_email = obis(
        &data,
        &[
            "enroll", "--username", "other", "--password", "pw", "--first-name", "A",
            "--last-name", "B", "--email", "not-an-email",
        ],
    );
    assert!(!bad_email.status.success());
}

#[test]
fn startup_migration_repairs_the_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    assert!(obis(&data, &["init"]).status.success());

    let config = Config::with_data_dir(&data);
    let path = config.student_path();
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("2000;x;pw;X;Y;x@yuni.edu;MAT101:1:not=80;dev=1|MAT101:1:not=85;dev=0\n");
    std::fs::write(&path, &text).unwrap();

    assert!(obis(&data, &["show", "--student", "2000"]).status.success());
    let repaired = std::fs::read_to_string(&path).unwrap();
    assert_ne!(repaired, text);
    let student = config.store().find(2000).unwrap().unwrap();
    assert_eq!(student.records.len(), 1);
    assert_eq!(student.records[0].legacy_grade, Some(85));

    assert!(obis(&data, &["roster", "--teacher", "1"]).status.success());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), repaired);
}

#[test]
fn enroll_without_teacher_file_assigns_no_courses() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    assert!(obis(&data, &["init"]).status.success());
    let config = Config::with_data_dir(&data);
    std::fs::remove_file(config.teacher_path()).unwrap();

    let out = obis(
        &data,
        &[
            "enroll", "--username", "yalniz", "--password", "pw", "--first-name", "Yalniz",
            "--last-name", "Ogrenci", "--email", "yalniz@yuni.edu",
        ],
    );
    assert!(out.status.success(), "enroll failed: {:?}", out);

    let student = config.store().find(1031).unwrap().unwrap();
    assert_eq!(student.username, "yalniz");
    assert!(student.records.is_empty());
}
