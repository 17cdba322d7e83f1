//! Deterministic fixture data: teachers, students and weekly timetables.
//!
//! All randomness comes from the `Rng` passed in, so a seeded `StdRng` gives the
//! same files on every run.

use crate::directory::{AdminRow, TeacherRow};
use crate::model::{EnrollmentRecord, StudentLine, TeacherId};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const COURSE_POOL: [&str; 10] = [
    "MAT101", "TUR101", "CMP203", "FIZ201", "INK101", "MAT201", "CMP201", "BIL103", "KIM101",
    "ENG101",
];

const DAYS: [&str; 5] = ["MON", "TUE", "WED", "THU", "FRI"];
const FIRST_HOUR: u32 = 9;
const LAST_HOUR: u32 = 16;
const SLOTS_PER_COURSE: usize = 2;
const COURSES_PER_STUDENT: usize = 5;
const FIRST_STUDENT_ID: u32 = 1001;
const MAX_SLOT_ATTEMPTS: usize = 200;

pub type Timetable = HashMap<TeacherId, HashMap<String, Vec<String>>>;

#[derive(Debug, Clone)]
pub struct TeacherSeed {
    pub row: TeacherRow,
    pub schedule: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct SeedData {
    pub teachers: Vec<TeacherSeed>,
    pub students: Vec<StudentLine>,
}

impl SeedData {
    pub fn teacher_rows(&self) -> Vec<TeacherRow> {
        self.teachers.iter().map(|t| t.row.clone()).collect()
    }

    pub fn timetable(&self) -> Timetable {
        self.teachers
            .iter()
            .map(|t| (t.row.id, t.schedule.clone()))
            .collect()
    }
}

pub fn default_admin() -> AdminRow {
    AdminRow {
        id: 1,
        username: "admin".into(),
        password: "admin123".into(),
        email: "admin@yuni.edu".into(),
        first_name: "Admin".into(),
        last_name: "User".into(),
    }
}

/// Picks `count` weekday slots not already in `used`, sorted.
pub fn pick_slots<R: Rng>(rng: &mut R, used: &mut HashSet<String>, count: usize) -> Vec<String> {
    let mut picked = Vec::with_capacity(count);
    for _ in 0..count {
        let slot = (0..MAX_SLOT_ATTEMPTS).find_map(|_| {
            let day = DAYS[rng.gen_range(0..DAYS.len())];
            let hour = rng.gen_range(FIRST_HOUR..=LAST_HOUR);
            let candidate = format!("{}-{:02}", day, hour);
            (!used.contains(&candidate)).then_some(candidate)
        });
        let Some(slot) = slot else {
            break;
        };
        used.insert(slot.clone());
        picked.push(slot);
    }
    picked.sort();
    picked
}

/// Two non-clashing slots per course for every teacher.
pub fn schedule_for<R: Rng>(rng: &mut R, teacher_courses: &BTreeMap<TeacherId, Vec<String>>) -> Timetable {
    teacher_courses
        .iter()
        .map(|(&teacher_id, courses)| {
            let mut used = HashSet::new();
            let schedule = courses
                .iter()
                .map(|c| (c.clone(), pick_slots(rng, &mut used, SLOTS_PER_COURSE)))
                .collect();
            (teacher_id, schedule)
        })
        .collect()
}

fn course_teachers(teacher_courses: &BTreeMap<TeacherId, Vec<String>>) -> BTreeMap<String, Vec<TeacherId>> {
    let mut by_course: BTreeMap<String, Vec<TeacherId>> = BTreeMap::new();
    for (&teacher_id, courses) in teacher_courses {
        for course in courses {
            by_course.entry(course.clone()).or_default().push(teacher_id);
        }
    }
    by_course
}

/// Up to `count` distinct courses, each with a teacher who teaches it.
pub fn random_enrollment<R: Rng>(
    rng: &mut R,
    teacher_courses: &BTreeMap<TeacherId, Vec<String>>,
    timetable: &Timetable,
    count: usize,
) -> Vec<EnrollmentRecord> {
    let by_course = course_teachers(teacher_courses);
    let mut pool: Vec<&String> = by_course.keys().collect();
    pool.shuffle(rng);

    pool.into_iter()
        .take(count)
        .filter_map(|course| {
            let teacher_id = *by_course.get(course)?.choose(rng)?;
            let slots = timetable
                .get(&teacher_id)
                .and_then(|s| s.get(course))
                .cloned()
                .unwrap_or_default();
            Some(EnrollmentRecord::new(course.clone(), teacher_id).with_schedule(slots))
        })
        .collect()
}

pub fn generate<R: Rng>(rng: &mut R, teacher_count: u32, student_count: u32) -> SeedData {
    let mut teachers = Vec::new();
    for id in 1..=teacher_count {
        let course_count = rng.gen_range(2..=4);
        let mut pool = COURSE_POOL.to_vec();
        pool.shuffle(rng);
        let courses: Vec<String> = pool.iter().take(course_count).map(|c| c.to_string()).collect();

        let mut used = HashSet::new();
        let schedule = courses
            .iter()
            .map(|c| (c.clone(), pick_slots(rng, &mut used, SLOTS_PER_COURSE)))
            .collect();

        teachers.push(TeacherSeed {
            row: TeacherRow {
                id,
                username: format!("ogrt{}", id),
                password: format!("ogrt{}", id),
                email: format!("ogrt{}@yuni.edu", id),
                first_name: format!("Ogretmen{}", id),
                last_name: format!("Soyad{}", id),
                courses: courses.join("|"),
            },
            schedule,
        });
    }

    let teacher_courses: BTreeMap<TeacherId, Vec<String>> = teachers
        .iter()
        .map(|t| (t.row.id, t.row.course_list()))
        .collect();
    let by_course = course_teachers(&teacher_courses);
    let schedules: HashMap<TeacherId, &HashMap<String, Vec<String>>> =
        teachers.iter().map(|t| (t.row.id, &t.schedule)).collect();

    let mut students = Vec::new();
    for i in 1..=student_count {
        let mut pool = COURSE_POOL.to_vec();
        pool.shuffle(rng);
        let mut records: Vec<EnrollmentRecord> = pool
            .iter()
            .take(COURSES_PER_STUDENT)
            .map(|&course| {
                let teacher_id = match by_course.get(course) {
                    Some(ids) if !ids.is_empty() => ids[rng.gen_range(0..ids.len())],
                    // nobody teaches it: any teacher
                    _ => rng.gen_range(1..=teacher_count.max(1)),
                };
                let slots = schedules
                    .get(&teacher_id)
                    .and_then(|s| s.get(course))
                    .cloned()
                    .unwrap_or_default();
                EnrollmentRecord::new(course, teacher_id).with_schedule(slots)
            })
            .collect();
        // canonical order, so a fresh file needs no migration
        records.sort_by_key(EnrollmentRecord::identity);

        students.push(StudentLine {
            id: FIRST_STUDENT_ID + i - 1,
            username: format!("ogr{}", i),
            password: format!("ogr{}", i),
            first_name: format!("Ogrenci{}", i),
            last_name: format!("Soyad{}", i),
            email: format!("ogr{}@yuni.edu", i),
            records,
        });
    }

    SeedData { teachers, students }
}
