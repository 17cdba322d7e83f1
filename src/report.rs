use crate::grading::GradingPolicy;
use crate::model::{SENTINEL, StudentId, StudentLine};
use crate::store::EnrollmentStore;
use anyhow::{Result, bail};
use chrono::Local;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::{Path, PathBuf};

const HEADERS: [&str; 11] = [
    "Student ID",
    "Name",
    "Course",
    "Teacher",
    "Schedule",
    "Midterm",
    "Final",
    "Average",
    "Letter",
    "Absences",
    "Outcome",
];
const LAST_COL: u16 = HEADERS.len() as u16 - 1;

fn output_path(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| {
        let mut out: PathBuf = input.into();
        out.set_extension("xlsx");
        out
    })
}

struct ReportFormats {
    title: Format,
    header: Format,
    cell: Format,
    left_align: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(18)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            cell: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            left_align: Format::new()
                .set_align(FormatAlign::Left)
                .set_border(FormatBorder::Thin)
                .set_bold()
                .set_align(FormatAlign::VerticalCenter),
        }
    }
}

fn write_report_header(ws: &mut Worksheet, date: &str, fmt: &ReportFormats) -> Result<u32> {
    const TITLE_ROW_HEIGHT: f64 = 30.0;

    ws.set_row_height(0, TITLE_ROW_HEIGHT)?;
    ws.merge_range(0, 0, 0, LAST_COL, "Student Transcript Summary", &fmt.title)?;
    ws.merge_range(1, 0, 1, LAST_COL, &format!("Generated: {}", date), &fmt.left_align)?;
    for (i, h) in HEADERS.iter().enumerate() {
        ws.write_string_with_format(2, i as u16, *h, &fmt.header)?;
    }
    Ok(3)
}

fn merge_or_write_str(
    ws: &mut Worksheet,
    start: u32,
    end: u32,
    col: u16,
    val: &str,
    fmt: &Format,
) -> Result<()> {
    if end > start {
        ws.merge_range(start, col, end, col, val, fmt)?;
    } else {
        ws.write_string_with_format(start, col, val, fmt)?;
    }
    Ok(())
}

fn merge_or_write_num(
    ws: &mut Worksheet,
    start: u32,
    end: u32,
    col: u16,
    val: f64,
    fmt: &Format,
) -> Result<()> {
    if end > start {
        ws.merge_range(start, col, end, col, &val.to_string(), fmt)?;
    } else {
        ws.write_number_with_format(start, col, val, fmt)?;
    }
    Ok(())
}

fn write_optional(ws: &mut Worksheet, row: u32, col: u16, val: Option<f64>, fmt: &Format) -> Result<()> {
    match val {
        Some(v) => ws.write_number_with_format(row, col, v, fmt)?,
        None => ws.write_string_with_format(row, col, SENTINEL, fmt)?,
    };
    Ok(())
}

fn set_column_widths(ws: &mut Worksheet) -> Result<()> {
    let widths = [10, 20, 10, 9, 18, 9, 9, 9, 8, 9, 18];
    for (col, w) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, *w)?;
    }
    Ok(())
}

fn write_student(
    ws: &mut Worksheet,
    row: &mut u32,
    student: &StudentLine,
    policy: &GradingPolicy,
    fmt: &Format,
) -> Result<()> {
    let start = *row;
    if student.records.is_empty() {
        for col in 2..=LAST_COL {
            ws.write_string_with_format(start, col, "/", fmt)?;
        }
        *row += 1;
    }
    for r in &student.records {
        let result = policy.evaluate(r);
        let schedule = if r.schedule.is_empty() {
            SENTINEL.to_string()
        } else {
            r.schedule.join(", ")
        };
        ws.write_string_with_format(*row, 2, &r.course_code, fmt)?;
        ws.write_number_with_format(*row, 3, r.teacher_id, fmt)?;
        ws.write_string_with_format(*row, 4, schedule, fmt)?;
        write_optional(ws, *row, 5, r.midterm.map(f64::from), fmt)?;
        write_optional(ws, *row, 6, r.final_score.map(f64::from), fmt)?;
        write_optional(ws, *row, 7, result.average.map(|a| (a * 100.0).round() / 100.0), fmt)?;
        let letter = result.letter.map(|l| l.to_string());
        ws.write_string_with_format(*row, 8, letter.as_deref().unwrap_or(SENTINEL), fmt)?;
        write_optional(ws, *row, 9, r.absences.map(f64::from), fmt)?;
        ws.write_string_with_format(*row, 10, result.outcome.to_string(), fmt)?;
        *row += 1;
    }

    let end = *row - 1;
    merge_or_write_num(ws, start, end, 0, f64::from(student.id), fmt)?;
    merge_or_write_str(ws, start, end, 1, &student.full_name(), fmt)?;
    Ok(())
}

/// Writes one row per enrollment record, optionally for a single student.
/// Defaults to the enrollment file's path with an `.xlsx` extension.
pub fn generate_transcript(
    store: &EnrollmentStore,
    policy: &GradingPolicy,
    output: Option<PathBuf>,
    student: Option<StudentId>,
) -> Result<PathBuf> {
    let output_path = output_path(store.path(), output);
    let mut students = store.students()?;
    if let Some(id) = student {
        students.retain(|s| s.id == id);
        if students.is_empty() {
            bail!("student {} not found in {}", id, store.path().display());
        }
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let fmt = ReportFormats::new();
    let date = Local::now().format("%Y-%m-%d").to_string();

    let mut row = write_report_header(worksheet, &date, &fmt)?;
    for s in &students {
        write_student(worksheet, &mut row, s, policy, &fmt.cell)?;
    }

    set_column_widths(worksheet)?;
    workbook.save(&output_path)?;
    tracing::info!(path = %output_path.display(), students = students.len(), "transcript written");
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const FILE: &str = "1001;ogr1;pw;Ayse;Yilmaz;ayse@yuni.edu;MAT101:1:vize=80;final=90;not=86;dev=0;prog=MON-09|CMP203:2\n\
1002;ogr2;pw;Mehmet;Demir;mehmet@yuni.edu;\n";

    #[test]
    fn default_output_sits_next_to_the_enrollment_file() {
        let out = output_path(Path::new("data/ogrenciler_yeni.txt"), None);
        assert_eq!(out, PathBuf::from("data/ogrenciler_yeni.xlsx"));
        let explicit = output_path(Path::new("x.txt"), Some(PathBuf::from("r.xlsx")));
        assert_eq!(explicit, PathBuf::from("r.xlsx"));
    }

    #[test]
    fn writes_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ogrenciler_yeni.txt");
        fs::write(&path, FILE).unwrap();
        let store = EnrollmentStore::new(&path);

        let out = generate_transcript(&store, &GradingPolicy::default(), None, None).unwrap();
        assert!(out.ends_with("ogrenciler_yeni.xlsx"));
        assert!(fs::metadata(&out).unwrap().len() > 0);
    }

    #[test]
    fn unknown_student_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ogrenciler_yeni.txt");
        fs::write(&path, FILE).unwrap();
        let store = EnrollmentStore::new(&path);
        let out = dir.path().join("one.xlsx");
        assert!(generate_transcript(&store, &GradingPolicy::default(), Some(out.clone()), Some(42)).is_err());
        assert!(!out.exists());
    }
}
