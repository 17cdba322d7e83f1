use std::fmt;

pub type StudentId = u32;
pub type TeacherId = u32;

/// Written in place of an optional numeric field that has not been entered.
pub const SENTINEL: &str = "-";

const NOT_ENTERED: &str = "not entered";

pub fn is_valid_score(value: i64) -> bool {
    (0..=100).contains(&value)
}

/// One course a student is taking, as stored inside the enrollment blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub course_code: String,
    pub teacher_id: TeacherId,
    pub midterm: Option<u8>,
    pub final_score: Option<u8>,
    /// Historical aggregate grade, kept next to midterm/final for older readers.
    pub legacy_grade: Option<u8>,
    pub absences: Option<u32>,
    pub schedule: Vec<String>,
}

/// Identity of a record within one student's line: upper-cased course code plus teacher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
    pub course_code: String,
    pub teacher_id: TeacherId,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.course_code, self.teacher_id)
    }
}

impl EnrollmentRecord {
    pub fn new(course_code: impl Into<String>, teacher_id: TeacherId) -> Self {
        Self {
            course_code: course_code.into(),
            teacher_id,
            midterm: None,
            final_score: None,
            legacy_grade: None,
            absences: None,
            schedule: Vec::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: Vec<String>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            course_code: self.course_code.to_ascii_uppercase(),
            teacher_id: self.teacher_id,
        }
    }

    pub fn matches(&self, course_code: &str, teacher_id: TeacherId) -> bool {
        self.teacher_id == teacher_id && self.course_code.eq_ignore_ascii_case(course_code)
    }

    /// Human-facing view: missing values read "not entered" instead of the sentinel.
    pub fn display(&self) -> RecordDisplay<'_> {
        RecordDisplay(self)
    }
}

pub struct RecordDisplay<'a>(&'a EnrollmentRecord);

fn label<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_ENTERED.to_string())
}

impl fmt::Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        let schedule = if r.schedule.is_empty() {
            SENTINEL.to_string()
        } else {
            r.schedule.join(",")
        };
        write!(
            f,
            "{} | teacher={} | schedule={} | midterm={} | final={} | absences={}",
            r.course_code,
            r.teacher_id,
            schedule,
            label(r.midterm),
            label(r.final_score),
            label(r.absences),
        )
    }
}

/// One data line of the enrollment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentLine {
    pub id: StudentId,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub records: Vec<EnrollmentRecord>,
}

impl StudentLine {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "First Last <email>", used when listing students for selection.
    pub fn contact_label(&self) -> String {
        format!("{} <{}>", self.full_name(), self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u32,
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: Role,
}
