//! Admin and teacher account files.
//!
//! Both are `;`-separated with `#` comment lines and no header row:
//! `id;username;password;email;firstName;lastName` for admins and the same
//! plus a `|`-joined course list for teachers.

use crate::config::Config;
use crate::model::{Account, Role, TeacherId};
use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

static COURSE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,5}[0-9]{3}$").expect("course pattern compiles"));

const ADMIN_COLUMNS: [&str; 6] = ["id", "username", "password", "email", "first_name", "last_name"];
const TEACHER_COLUMNS: [&str; 7] = [
    "id",
    "username",
    "password",
    "email",
    "first_name",
    "last_name",
    "courses",
];

pub const ADMIN_HEADER: &str = "# id;username;password;email;ad;soyad";
pub const TEACHER_HEADER: &str = "# id;username;password;email;ad;soyad;dersler\n# dersler: MAT101|FIZ201|CMP203";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdminRow {
    pub id: u32,
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TeacherRow {
    pub id: TeacherId,
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub courses: String,
}

impl TeacherRow {
    pub fn course_list(&self) -> Vec<String> {
        self.courses
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn teaches(&self, course_code: &str) -> bool {
        self.course_list()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(course_code))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

pub fn is_valid_course_code(code: &str) -> bool {
    COURSE_CODE.is_match(code.trim())
}

fn read_rows<T: DeserializeOwned, P: AsRef<Path>>(path: P, columns: &[&str]) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(file);
    let headers = StringRecord::from(columns.to_vec());

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.with_context(|| format!("failed to read {}", path.display()))?;
        if record.len() < columns.len() {
            tracing::warn!(path = %path.display(), fields = record.len(), "skipping short row");
            continue;
        }
        match record.deserialize(Some(&headers)) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable row"),
        }
    }
    Ok(rows)
}

pub fn load_admins<P: AsRef<Path>>(path: P) -> Result<Vec<AdminRow>> {
    read_rows(path, &ADMIN_COLUMNS)
}

pub fn load_teachers<P: AsRef<Path>>(path: P) -> Result<Vec<TeacherRow>> {
    read_rows(path, &TEACHER_COLUMNS)
}

/// teacher id -> courses taught, in file order.
pub fn teacher_courses<P: AsRef<Path>>(path: P) -> Result<BTreeMap<TeacherId, Vec<String>>> {
    Ok(load_teachers(path)?
        .into_iter()
        .map(|t| (t.id, t.course_list()))
        .collect())
}

fn write_rows<T: Serialize, P: AsRef<Path>>(path: P, header: &str, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    writeln!(file, "{}", header)?;
    let mut wtr = WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_admins<P: AsRef<Path>>(path: P, rows: &[AdminRow]) -> Result<()> {
    write_rows(path, ADMIN_HEADER, rows)
}

pub fn write_teachers<P: AsRef<Path>>(path: P, rows: &[TeacherRow]) -> Result<()> {
    write_rows(path, TEACHER_HEADER, rows)
}

/// Looks the user up in the file for `role`. `Ok(None)` means bad credentials.
pub fn authenticate(
    config: &Config,
    role: Role,
    username: &str,
    password: &str,
) -> Result<Option<Account>> {
    let account = match role {
        Role::Admin => load_admins(config.admin_path())?
            .into_iter()
            .find(|a| a.username == username && a.password == password)
            .map(|a| Account {
                id: a.id,
                username: a.username,
                password: a.password,
                email: a.email,
                role,
            }),
        Role::Teacher => load_teachers(config.teacher_path())?
            .into_iter()
            .find(|t| t.username == username && t.password == password)
            .map(|t| Account {
                id: t.id,
                username: t.username,
                password: t.password,
                email: t.email,
                role,
            }),
        Role::Student => config
            .store()
            .students()?
            .into_iter()
            .find(|s| s.username == username && s.password == password)
            .map(|s| Account {
                id: s.id,
                username: s.username,
                password: s.password,
                email: s.email,
                role,
            }),
    };
    if account.is_none() {
        tracing::warn!(%role, username, "login rejected");
    }
    Ok(account)
}
