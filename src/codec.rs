//! Text form of enrollment records and student lines.
//!
//! Record grammar: `CODE:teacher[:key=value;key=value...]`. Recognised keys are
//! `vize`, `final`, `not`, `dev` and `prog`; the last occurrence of a key wins.
//! Canonical output always carries all five keys in that order.

use crate::error::EnrollmentError;
use crate::model::{EnrollmentRecord, SENTINEL, StudentId, StudentLine};
use crate::tokenizer::{self, FIELD_SEPARATOR, RECORD_SEPARATOR, Tokenizer};

/// Number of `;`-separated top-level fields on a student line.
pub const LINE_FIELDS: usize = 7;

const SCHEDULE_SEPARATOR: char = ',';

pub fn is_comment_or_blank(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// Parses one record token. Returns `None` when the identity key is unusable.
pub fn parse_record(token: &str) -> Option<EnrollmentRecord> {
    let token = token.trim();
    let (code, rest) = token.split_once(':')?;
    let code = code.trim();
    if code.is_empty() {
        return None;
    }

    let (teacher, fields) = match rest.split_once(':') {
        Some((teacher, fields)) => (teacher, Some(fields)),
        None => (rest, None),
    };
    let teacher_id = teacher.trim().parse().ok()?;

    let mut record = EnrollmentRecord::new(code, teacher_id);
    for pair in fields.unwrap_or_default().split(FIELD_SEPARATOR) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "vize" => record.midterm = parse_score(value, "vize"),
            "final" => record.final_score = parse_score(value, "final"),
            "not" => record.legacy_grade = parse_score(value, "not"),
            "dev" => record.absences = parse_count(value),
            "prog" => record.schedule = parse_schedule(value),
            _ => {}
        }
    }
    Some(record)
}

fn parse_score(value: &str, key: &str) -> Option<u8> {
    if value.is_empty() || value == SENTINEL {
        return None;
    }
    match value.parse::<i64>() {
        Ok(v) if crate::model::is_valid_score(v) => Some(v as u8),
        _ => {
            tracing::warn!(key, value, "unreadable score treated as not entered");
            None
        }
    }
}

fn parse_count(value: &str) -> Option<u32> {
    if value.is_empty() || value == SENTINEL {
        return None;
    }
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(value, "unreadable absence count treated as not entered");
            None
        }
    }
}

pub fn parse_schedule(value: &str) -> Vec<String> {
    value
        .split(SCHEDULE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Slot text with the line and record delimiters replaced by `,`.
pub fn sanitize_schedule(slots: &[String]) -> String {
    slots
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
        .replace([FIELD_SEPARATOR, RECORD_SEPARATOR], ",")
        .replace(['\r', '\n'], "")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| SENTINEL.to_string())
}

/// Canonical single-token form of a record.
pub fn serialize_record(record: &EnrollmentRecord) -> String {
    format!(
        "{}:{}:vize={};final={};not={};dev={};prog={}",
        record.course_code.trim(),
        record.teacher_id,
        optional(record.midterm),
        optional(record.final_score),
        optional(record.legacy_grade),
        optional(record.absences),
        sanitize_schedule(&record.schedule),
    )
}

pub fn serialize_records(records: &[EnrollmentRecord]) -> String {
    records
        .iter()
        .map(serialize_record)
        .collect::<Vec<_>>()
        .join("|")
}

/// Every record in one token; a token that still holds several record starts
/// is cut again and each part parsed on its own.
pub fn records_from_token(token: &str) -> Vec<EnrollmentRecord> {
    if tokenizer::count_record_starts(token) <= 1 {
        return parse_record(token).into_iter().collect();
    }
    tokenizer::split_at_record_starts(token)
        .into_iter()
        .filter_map(parse_record)
        .collect()
}

/// Tokenizes a blob and parses every record out of it, in blob order.
pub fn records_from_blob(
    blob: &str,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
    let mut records = Vec::new();
    for token in tokenizer.tokenize(blob)? {
        let parsed = records_from_token(token);
        if parsed.is_empty() {
            tracing::warn!(token, "dropping unparseable enrollment token");
        }
        records.extend(parsed);
    }
    Ok(records)
}

/// A data line split into its head fields and the raw enrollment blob.
#[derive(Debug, Clone, Copy)]
pub struct RawStudentLine<'a> {
    pub id: StudentId,
    pub head: [&'a str; LINE_FIELDS - 1],
    pub blob: &'a str,
}

impl<'a> RawStudentLine<'a> {
    /// `None` for comments, blanks, short lines and lines with a non-numeric id.
    pub fn split(line: &'a str) -> Option<Self> {
        if is_comment_or_blank(line) {
            return None;
        }
        let mut parts = line.trim().splitn(LINE_FIELDS, FIELD_SEPARATOR);
        let mut head = [""; LINE_FIELDS - 1];
        for slot in head.iter_mut() {
            *slot = parts.next()?;
        }
        let blob = parts.next()?;
        let id = head[0].trim().parse().ok()?;
        Some(Self { id, head, blob })
    }

    /// The line with its blob replaced; head fields are kept as written.
    pub fn with_blob(&self, blob: &str) -> String {
        let mut line = self.head.join(";");
        line.push(FIELD_SEPARATOR);
        line.push_str(blob);
        line.replace(['\r', '\n'], "")
    }

    pub fn into_student(
        self,
        tokenizer: &dyn Tokenizer,
    ) -> Result<StudentLine, EnrollmentError> {
        Ok(StudentLine {
            id: self.id,
            username: self.head[1].trim().to_string(),
            password: self.head[2].to_string(),
            first_name: self.head[3].trim().to_string(),
            last_name: self.head[4].trim().to_string(),
            email: self.head[5].trim().to_string(),
            records: records_from_blob(self.blob, tokenizer)?,
        })
    }
}

pub fn format_student_line(student: &StudentLine) -> String {
    format!(
        "{};{};{};{};{};{};{}",
        student.id,
        student.username,
        student.password,
        student.first_name,
        student.last_name,
        student.email,
        serialize_records(&student.records),
    )
    .replace(['\r', '\n'], "")
}
