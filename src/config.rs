use crate::grading::GradingPolicy;
use crate::store::EnrollmentStore;
use crate::tokenizer::{RecoveringTokenizer, StrictTokenizer};
use std::path::PathBuf;

pub const ADMIN_FILE: &str = "idare.txt";
pub const TEACHER_FILE: &str = "ogretmenler.txt";
pub const STUDENT_FILE: &str = "ogrenciler_yeni.txt";

/// Fixed seed for the timetable handed to the startup migration.
pub const SCHEDULE_SEED: u64 = 4242;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub admin_file: String,
    pub teacher_file: String,
    pub student_file: String,
    pub strict: bool,
    pub seed: u64,
    pub policy: GradingPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            admin_file: ADMIN_FILE.to_string(),
            teacher_file: TEACHER_FILE.to_string(),
            student_file: STUDENT_FILE.to_string(),
            strict: false,
            seed: 42,
            policy: GradingPolicy::default(),
        }
    }
}

impl Config {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn admin_path(&self) -> PathBuf {
        self.data_dir.join(&self.admin_file)
    }

    pub fn teacher_path(&self) -> PathBuf {
        self.data_dir.join(&self.teacher_file)
    }

    pub fn student_path(&self) -> PathBuf {
        self.data_dir.join(&self.student_file)
    }

    pub fn store(&self) -> EnrollmentStore {
        let store = EnrollmentStore::new(self.student_path());
        if self.strict {
            store.with_tokenizer(Box::new(StrictTokenizer))
        } else {
            store.with_tokenizer(Box::new(RecoveringTokenizer))
        }
    }
}
