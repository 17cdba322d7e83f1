use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use obis::config::{self, Config, SCHEDULE_SEED};
use obis::directory;
use obis::init;
use obis::logging;
use obis::migrate::{self, MigrationReport, NoSchedules};
use obis::model::{Role, StudentId, StudentLine, TeacherId};
use obis::report;
use obis::seed;
use obis::store::{RecordUpdate, UpdateOutcome};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, global = true, env = "OBIS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, global = true, default_value = config::ADMIN_FILE)]
    admin_file: String,

    #[arg(long, global = true, default_value = config::TEACHER_FILE)]
    teacher_file: String,

    #[arg(long, global = true, default_value = config::STUDENT_FILE)]
    student_file: String,

    /// Refuse merged records instead of recovering them
    #[arg(long, global = true)]
    strict: bool,

    #[arg(long, global = true)]
    skip_migration: bool,

    /// Seed for generated data files and course assignment
    #[arg(long, global = true, env = "OBIS_SEED", default_value_t = 42)]
    seed: u64,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create any missing data file
    Init,
    /// Rewrite the enrollment file in canonical form
    Migrate,
    Login {
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Print one student's courses
    Show {
        #[arg(long)]
        student: StudentId,
    },
    /// List students taking a teacher's courses
    Roster {
        #[arg(long)]
        teacher: TeacherId,
        #[arg(long)]
        course: Option<String>,
    },
    /// Enter midterm and final scores
    Grade {
        #[arg(long)]
        student: StudentId,
        #[arg(long)]
        course: String,
        #[arg(long)]
        teacher: TeacherId,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        midterm: u8,
        #[arg(long = "final", value_parser = clap::value_parser!(u8).range(0..=100))]
        final_score: u8,
    },
    /// Set the absence count
    Absence {
        #[arg(long)]
        student: StudentId,
        #[arg(long)]
        course: String,
        #[arg(long)]
        teacher: TeacherId,
        #[arg(long)]
        count: u32,
    },
    /// Add a student with randomly assigned courses
    Enroll {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 5)]
        courses: usize,
    },
    /// Write the xlsx transcript
    Report {
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        student: Option<StudentId>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RoleArg {
    Admin,
    Teacher,
    Student,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Student => Role::Student,
        }
    }
}

impl Args {
    fn config(&self) -> Config {
        Config {
            data_dir: self.data_dir.clone(),
            admin_file: self.admin_file.clone(),
            teacher_file: self.teacher_file.clone(),
            student_file: self.student_file.clone(),
            strict: self.strict,
            seed: self.seed,
            ..Config::default()
        }
    }
}

fn run_migration(config: &Config) -> Result<MigrationReport> {
    let store = config.store();
    let teacher_path = config.teacher_path();
    if !teacher_path.exists() {
        tracing::warn!(path = %teacher_path.display(), "teacher file missing, schedules will not be backfilled");
        return migrate::migrate(&store, &NoSchedules);
    }
    let teacher_courses = directory::teacher_courses(&teacher_path)?;
    let timetable = seed::schedule_for(&mut StdRng::seed_from_u64(SCHEDULE_SEED), &teacher_courses);
    migrate::migrate(&store, &timetable)
}

fn report_update(outcome: UpdateOutcome, student: StudentId, course: &str, teacher: TeacherId) -> Result<()> {
    match outcome {
        UpdateOutcome::Updated => {
            println!("Updated {} for student {}", course.to_ascii_uppercase(), student);
            Ok(())
        }
        UpdateOutcome::RecordNotFound => {
            bail!("student {} has no {} record with teacher {}", student, course, teacher)
        }
        UpdateOutcome::StudentNotFound => bail!("student {} not found", student),
    }
}

fn print_student(config: &Config, student: &StudentLine) {
    println!("{} {}", student.id, student.contact_label());
    if student.records.is_empty() {
        println!("  (no courses)");
    }
    for r in &student.records {
        let result = config.policy.evaluate(r);
        let letter = result.letter.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
        println!("  {} | letter={} | {}", r.display(), letter, result.outcome);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_console_logging(args.verbose);
    let config = args.config();

    let startup_migration =
        !args.skip_migration && !matches!(args.command, Command::Init | Command::Migrate);
    if startup_migration {
        if config.student_path().exists() {
            run_migration(&config)?;
        } else {
            tracing::warn!(path = %config.student_path().display(), "enrollment file missing, run `obis init`");
        }
    }

    let store = config.store();
    match args.command {
        Command::Init => {
            let summary = init::ensure_data_files(&config, &mut StdRng::seed_from_u64(config.seed))?;
            println!(
                "Data directory {} ready (admins: {}, teachers: {}, students: {})",
                config.data_dir.display(),
                if summary.admins_written { "created" } else { "kept" },
                if summary.teachers_written { "created" } else { "kept" },
                if summary.students_written { "created" } else { "kept" },
            );
        }
        Command::Migrate => {
            let report = run_migration(&config)?;
            println!(
                "{} students, {} lines rewritten, {} duplicates dropped, {} schedules backfilled",
                report.students_seen,
                report.lines_rewritten,
                report.duplicates_dropped,
                report.schedules_backfilled
            );
        }
        Command::Login {
            role,
            username,
            password,
        } => match directory::authenticate(&config, role.into(), &username, &password)? {
            Some(account) => println!(
                "Logged in as {} {} (id {}, {})",
                account.role, account.username, account.id, account.email
            ),
            None => bail!("invalid username or password"),
        },
        Command::Show { student } => match store.find(student)? {
            Some(s) => print_student(&config, &s),
            None => bail!("student {} not found", student),
        },
        Command::Roster { teacher, course } => {
            let roster = store.roster(teacher, course.as_deref())?;
            if roster.is_empty() {
                println!("No students for teacher {}", teacher);
            }
            for (student, records) in roster {
                for r in records {
                    println!("{} {} | {}", student.id, student.full_name(), r.display());
                }
            }
        }
        Command::Grade {
            student,
            course,
            teacher,
            midterm,
            final_score,
        } => {
            if !directory::is_valid_course_code(&course) {
                bail!("invalid course code: {}", course);
            }
            let update = RecordUpdate {
                legacy_grade: Some(config.policy.legacy_grade(midterm, final_score)),
                ..RecordUpdate::scores(Some(midterm), Some(final_score))
            };
            let outcome = store.update_record(student, &course, teacher, &update)?;
            report_update(outcome, student, &course, teacher)?;
        }
        Command::Absence {
            student,
            course,
            teacher,
            count,
        } => {
            if !directory::is_valid_course_code(&course) {
                bail!("invalid course code: {}", course);
            }
            let outcome = store.update_attendance(student, &course, teacher, count)?;
            report_update(outcome, student, &course, teacher)?;
        }
        Command::Enroll {
            username,
            password,
            first_name,
            last_name,
            email,
            courses,
        } => {
            if !directory::is_valid_email(&email) {
                bail!("invalid email address: {}", email);
            }
            if config.student_path().exists()
                && store.students()?.iter().any(|s| s.username == username)
            {
                bail!("username {} is already taken", username);
            }

            let id = store.next_id()?;
            let teacher_path = config.teacher_path();
            let teacher_courses = if teacher_path.exists() {
                directory::teacher_courses(&teacher_path)?
            } else {
                tracing::warn!(path = %teacher_path.display(), "teacher file missing, enrolling without courses");
                BTreeMap::new()
            };
            let timetable =
                seed::schedule_for(&mut StdRng::seed_from_u64(SCHEDULE_SEED), &teacher_courses);
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(u64::from(id)));
            let records = seed::random_enrollment(&mut rng, &teacher_courses, &timetable, courses);

            let student = StudentLine {
                id,
                username,
                password,
                first_name,
                last_name,
                email,
                records,
            };
            store.append(&student)?;
            println!("Enrolled student {}", student.id);
            print_student(&config, &student);
        }
        Command::Report { output, student } => {
            let path = report::generate_transcript(&store, &config.policy, output, student)?;
            println!("Report written: {}", path.display());
        }
    }
    Ok(())
}
