use crate::codec;
use crate::config::Config;
use crate::directory;
use crate::seed::{self, SeedData};
use anyhow::{Context, Result};
use rand::Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const STUDENT_HEADER: &str = "# id;username;password;ad;soyad;email;aldigiDersler\n\
# aldigiDersler: DERS:ogretmenId:vize=;final=;not=;dev=;prog=|...";

const SEED_TEACHERS: u32 = 20;
const SEED_STUDENTS: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitSummary {
    pub admins_written: bool,
    pub teachers_written: bool,
    pub students_written: bool,
}

pub fn write_students<P: AsRef<Path>>(path: P, data: &SeedData) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", STUDENT_HEADER)?;
    for student in &data.students {
        writeln!(out, "{}", codec::format_student_line(student))?;
    }
    out.flush()?;
    Ok(())
}

/// Creates the data directory and any missing data file. Existing files are
/// never touched.
pub fn ensure_data_files<R: Rng>(config: &Config, rng: &mut R) -> Result<InitSummary> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let mut summary = InitSummary::default();
    let data = seed::generate(rng, SEED_TEACHERS, SEED_STUDENTS);

    let admin_path = config.admin_path();
    if !admin_path.exists() {
        directory::write_admins(&admin_path, &[seed::default_admin()])?;
        summary.admins_written = true;
        tracing::info!(path = %admin_path.display(), "admin file created");
    }

    let teacher_path = config.teacher_path();
    if !teacher_path.exists() {
        directory::write_teachers(&teacher_path, &data.teacher_rows())?;
        summary.teachers_written = true;
        tracing::info!(path = %teacher_path.display(), teachers = data.teachers.len(), "teacher file created");
    }

    let student_path = config.student_path();
    if !student_path.exists() {
        write_students(&student_path, &data)?;
        summary.students_written = true;
        tracing::info!(path = %student_path.display(), students = data.students.len(), "student file created");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    #[test]
    fn writes_only_missing_files() {
        let dir = tempdir().unwrap();
        let config = Config::with_data_dir(dir.path().join("data"));

        let first = ensure_data_files(&config, &mut StdRng::seed_from_u64(42)).unwrap();
        assert!(first.admins_written && first.teachers_written && first.students_written);

        fs::write(config.admin_path(), "# mine\n").unwrap();
        fs::remove_file(config.teacher_path()).unwrap();
        let second = ensure_data_files(&config, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(
            second,
            InitSummary {
                admins_written: false,
                teachers_written: true,
                students_written: false,
            }
        );
        assert_eq!(fs::read_to_string(config.admin_path()).unwrap(), "# mine\n");
    }

    #[test]
    fn seeded_files_load_back() {
        let dir = tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        ensure_data_files(&config, &mut StdRng::seed_from_u64(42)).unwrap();

        let admins = directory::load_admins(config.admin_path()).unwrap();
        assert_eq!(admins[0].username, "admin");
        let teachers = directory::load_teachers(config.teacher_path()).unwrap();
        assert_eq!(teachers.len(), SEED_TEACHERS as usize);

        let students = config.store().students().unwrap();
        assert_eq!(students.len(), SEED_STUDENTS as usize);
        assert_eq!(students[0].id, 1001);
        let text = fs::read_to_string(config.student_path()).unwrap();
        assert!(text.starts_with("# id;username;password;ad;soyad;email;aldigiDersler"));

        let report = crate::migrate::migrate(&config.store(), &crate::migrate::NoSchedules).unwrap();
        assert!(!report.file_changed);
    }
}
