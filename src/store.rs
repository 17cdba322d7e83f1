//! Whole-file read-modify-write over the enrollment file.
//!
//! Every mutation re-reads the complete file, rebuilds it in memory and writes
//! it back through a temporary sibling that is renamed over the original.
//! There is no locking: callers must not run two writers at once.

use crate::codec::{self, RawStudentLine};
use crate::error::EnrollmentError;
use crate::model::{EnrollmentRecord, StudentId, StudentLine, TeacherId};
use crate::tokenizer::{RecoveringTokenizer, Tokenizer};
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// One line of the file with its own terminator (`"\n"`, `"\r\n"` or none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub ending: &'static str,
}

/// Raw file content, split into lines that keep their terminators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub lines: Vec<Line>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .split_inclusive('\n')
            .map(|chunk| {
                let (body, ending) = if let Some(body) = chunk.strip_suffix("\r\n") {
                    (body, "\r\n")
                } else if let Some(body) = chunk.strip_suffix('\n') {
                    (body, "\n")
                } else {
                    (chunk, "")
                };
                Line {
                    text: body.to_string(),
                    ending,
                }
            })
            .collect();
        Self { lines }
    }

    pub fn render(&self) -> String {
        self.lines
            .iter()
            .flat_map(|line| [line.text.as_str(), line.ending])
            .collect()
    }
}

/// Field changes for one record. `None` leaves the field as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub midterm: Option<u8>,
    pub final_score: Option<u8>,
    pub legacy_grade: Option<u8>,
    pub absences: Option<u32>,
}

impl RecordUpdate {
    pub fn scores(midterm: Option<u8>, final_score: Option<u8>) -> Self {
        Self {
            midterm,
            final_score,
            ..Self::default()
        }
    }

    pub fn attendance(absences: u32) -> Self {
        Self {
            absences: Some(absences),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EnrollmentError> {
        let scores = [
            ("midterm", self.midterm),
            ("final", self.final_score),
            ("legacy grade", self.legacy_grade),
        ];
        for (field, value) in scores {
            if let Some(value) = value
                && !crate::model::is_valid_score(value.into())
            {
                return Err(EnrollmentError::ScoreOutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn apply(&self, record: &mut EnrollmentRecord) {
        if let Some(v) = self.midterm {
            record.midterm = Some(v);
        }
        if let Some(v) = self.final_score {
            record.final_score = Some(v);
        }
        if let Some(v) = self.legacy_grade {
            record.legacy_grade = Some(v);
        }
        if let Some(v) = self.absences {
            record.absences = Some(v);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The student exists but has no record with that course and teacher.
    RecordNotFound,
    StudentNotFound,
}

pub struct EnrollmentStore {
    path: PathBuf,
    tokenizer: Box<dyn Tokenizer>,
}

impl EnrollmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokenizer: Box::new(RecoveringTokenizer),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn read_document(&self) -> Result<Document> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(Document::parse(&text))
    }

    /// Sibling used for atomic writes: the full file name plus `.tmp`.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn write_document(&self, doc: &Document) -> Result<()> {
        let tmp = self.temp_path();
        let written = fs::write(&tmp, doc.render())
            .with_context(|| format!("failed to write {}", tmp.display()))
            .and_then(|()| {
                fs::rename(&tmp, &self.path).with_context(|| {
                    format!(
                        "failed to move {} over {}",
                        tmp.display(),
                        self.path.display()
                    )
                })
            });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }

    /// Runs `edit` over every student line and writes the file back when any
    /// line changed. `edit` returns the replacement line, or `None` to keep it.
    /// Comments, blanks and malformed lines are never offered to `edit`.
    pub fn rewrite<F>(&self, mut edit: F) -> Result<bool>
    where
        F: FnMut(RawStudentLine<'_>) -> Result<Option<String>>,
    {
        let doc = self.read_document()?;
        let mut lines = Vec::with_capacity(doc.lines.len());
        let mut changed = false;

        for line in &doc.lines {
            let replacement = match RawStudentLine::split(&line.text) {
                Some(raw) => edit(raw)?,
                None => None,
            };
            match replacement {
                Some(text) if text != line.text => {
                    changed = true;
                    lines.push(Line {
                        text,
                        ending: line.ending,
                    });
                }
                _ => lines.push(line.clone()),
            }
        }

        if changed {
            self.write_document(&Document { lines })?;
        }
        Ok(changed)
    }

    /// Applies `update` to the record keyed by (course, teacher) on every line
    /// of `student_id`. All records on a touched line are written back in
    /// canonical form.
    pub fn update_record(
        &self,
        student_id: StudentId,
        course_code: &str,
        teacher_id: TeacherId,
        update: &RecordUpdate,
    ) -> Result<UpdateOutcome> {
        update.validate()?;

        let mut student_seen = false;
        let mut record_seen = false;
        let tokenizer = self.tokenizer();

        let changed = self.rewrite(|raw| {
            if raw.id != student_id {
                return Ok(None);
            }
            student_seen = true;

            let mut records = codec::records_from_blob(raw.blob, tokenizer)?;
            for record in records.iter_mut() {
                if record.matches(course_code, teacher_id) {
                    update.apply(record);
                    record_seen = true;
                }
            }
            Ok(Some(raw.with_blob(&codec::serialize_records(&records))))
        })?;

        let outcome = match (student_seen, record_seen) {
            (false, _) => UpdateOutcome::StudentNotFound,
            (true, false) => UpdateOutcome::RecordNotFound,
            (true, true) => UpdateOutcome::Updated,
        };
        tracing::info!(
            student_id,
            course = course_code,
            teacher_id,
            ?outcome,
            file_changed = changed,
            "enrollment record update"
        );
        Ok(outcome)
    }

    /// Sets midterm and/or final. Absences, legacy grade and schedule are kept.
    pub fn update_scores(
        &self,
        student_id: StudentId,
        course_code: &str,
        teacher_id: TeacherId,
        midterm: Option<u8>,
        final_score: Option<u8>,
    ) -> Result<UpdateOutcome> {
        let update = RecordUpdate::scores(midterm, final_score);
        self.update_record(student_id, course_code, teacher_id, &update)
    }

    /// Sets the absence count. Scores and schedule are kept.
    pub fn update_attendance(
        &self,
        student_id: StudentId,
        course_code: &str,
        teacher_id: TeacherId,
        absences: u32,
    ) -> Result<UpdateOutcome> {
        let update = RecordUpdate::attendance(absences);
        self.update_record(student_id, course_code, teacher_id, &update)
    }

    pub fn students(&self) -> Result<Vec<StudentLine>> {
        let doc = self.read_document()?;
        let mut students = Vec::new();
        for line in &doc.lines {
            if let Some(raw) = RawStudentLine::split(&line.text) {
                students.push(raw.into_student(self.tokenizer())?);
            }
        }
        Ok(students)
    }

    pub fn find(&self, student_id: StudentId) -> Result<Option<StudentLine>> {
        Ok(self
            .students()?
            .into_iter()
            .find(|s| s.id == student_id))
    }

    /// Students taking a course from `teacher_id`, each with the matching records.
    pub fn roster(
        &self,
        teacher_id: TeacherId,
        course_code: Option<&str>,
    ) -> Result<Vec<(StudentLine, Vec<EnrollmentRecord>)>> {
        let mut roster = Vec::new();
        for student in self.students()? {
            let taught: Vec<EnrollmentRecord> = student
                .records
                .iter()
                .filter(|r| r.teacher_id == teacher_id)
                .filter(|r| course_code.is_none_or(|c| r.course_code.eq_ignore_ascii_case(c)))
                .cloned()
                .collect();
            if !taught.is_empty() {
                roster.push((student, taught));
            }
        }
        Ok(roster)
    }

    /// Highest id in the file plus one; 1 for a missing or empty file.
    pub fn next_id(&self) -> Result<StudentId> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let max = text
            .lines()
            .filter(|l| !codec::is_comment_or_blank(l))
            .filter_map(|l| l.trim().split(';').next()?.trim().parse::<StudentId>().ok())
            .max()
            .unwrap_or(0);
        max.checked_add(1)
            .with_context(|| format!("no student id left after {} in {}", max, self.path.display()))
    }

    pub fn append(&self, student: &StudentLine) -> Result<()> {
        let head = [
            ("username", &student.username),
            ("password", &student.password),
            ("first name", &student.first_name),
            ("last name", &student.last_name),
            ("email", &student.email),
        ];
        for (field, value) in head {
            if value.contains([';', '\r', '\n']) {
                return Err(EnrollmentError::InvalidField { field }.into());
            }
        }

        let needs_newline = match fs::read(&self.path) {
            Ok(bytes) => !bytes.is_empty() && !bytes.ends_with(b"\n"),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        if needs_newline {
            writeln!(file)?;
        }
        writeln!(file, "{}", codec::format_student_line(student))
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        tracing::info!(student_id = student.id, "student appended");
        Ok(())
    }
}
