//! One-shot canonicalization of the enrollment file.
//!
//! Each student's blob is re-tokenized, records sharing an identity key are
//! collapsed (the later one wins), blank schedules are backfilled from the
//! teachers' timetables and the result is written sorted by identity key.
//! Running it again on its own output changes nothing.

use crate::codec;
use crate::model::{EnrollmentRecord, IdentityKey, TeacherId};
use crate::store::EnrollmentStore;
use crate::tokenizer::Tokenizer;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

/// Source of weekly slots for a (teacher, course) pair.
pub trait ScheduleLookup {
    fn slots(&self, teacher_id: TeacherId, course_code: &str) -> Option<Vec<String>>;
}

/// Lookup that never has anything; migration then only canonicalizes.
pub struct NoSchedules;

impl ScheduleLookup for NoSchedules {
    fn slots(&self, _teacher_id: TeacherId, _course_code: &str) -> Option<Vec<String>> {
        None
    }
}

impl ScheduleLookup for HashMap<TeacherId, HashMap<String, Vec<String>>> {
    fn slots(&self, teacher_id: TeacherId, course_code: &str) -> Option<Vec<String>> {
        let courses = self.get(&teacher_id)?;
        courses
            .get(course_code)
            .or_else(|| {
                courses
                    .iter()
                    .find(|(code, _)| code.eq_ignore_ascii_case(course_code))
                    .map(|(_, slots)| slots)
            })
            .filter(|slots| !slots.is_empty())
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub students_seen: usize,
    pub lines_rewritten: usize,
    pub duplicates_dropped: usize,
    pub schedules_backfilled: usize,
    pub file_changed: bool,
}

/// Canonical blob for one student: deduplicated, backfilled, sorted.
pub fn canonicalize_blob(
    blob: &str,
    tokenizer: &dyn Tokenizer,
    schedules: &dyn ScheduleLookup,
    report: &mut MigrationReport,
) -> Result<String> {
    let mut unique: BTreeMap<IdentityKey, EnrollmentRecord> = BTreeMap::new();
    for mut record in codec::records_from_blob(blob, tokenizer)? {
        if record.schedule.is_empty()
            && let Some(slots) = schedules.slots(record.teacher_id, &record.course_code)
        {
            record.schedule = slots;
            report.schedules_backfilled += 1;
        }
        if unique.insert(record.identity(), record).is_some() {
            report.duplicates_dropped += 1;
        }
    }
    let records: Vec<EnrollmentRecord> = unique.into_values().collect();
    Ok(codec::serialize_records(&records))
}

pub fn migrate(store: &EnrollmentStore, schedules: &dyn ScheduleLookup) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    let tokenizer = store.tokenizer();

    let changed = store.rewrite(|raw| {
        report.students_seen += 1;
        if raw.blob.trim().is_empty() {
            return Ok(None);
        }
        let blob = canonicalize_blob(raw.blob, tokenizer, schedules, &mut report)?;
        if blob == raw.blob {
            return Ok(None);
        }
        report.lines_rewritten += 1;
        Ok(Some(raw.with_blob(&blob)))
    })?;
    report.file_changed = changed;

    if changed {
        tracing::info!(
            path = %store.path().display(),
            lines = report.lines_rewritten,
            duplicates = report.duplicates_dropped,
            backfilled = report.schedules_backfilled,
            "enrollment file migrated to canonical form"
        );
    } else {
        tracing::info!(path = %store.path().display(), "no migration needed");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::RecoveringTokenizer;

    fn timetable() -> HashMap<TeacherId, HashMap<String, Vec<String>>> {
        let mut t = HashMap::new();
        t.insert(
            1,
            HashMap::from([("MAT101".to_string(), vec!["MON-09".to_string(), "TUE-10".to_string()])]),
        );
        t
    }

    #[test]
    fn duplicates_collapse_to_the_later_record() {
        let mut report = MigrationReport::default();
        let blob = canonicalize_blob(
            "MAT101:1:not=80;dev=1|MAT101:1:not=85;dev=0",
            &RecoveringTokenizer,
            &NoSchedules,
            &mut report,
        )
        .unwrap();
        assert_eq!(blob, "MAT101:1:vize=-;final=-;not=85;dev=0;prog=");
        assert_eq!(report.duplicates_dropped, 1);
    }

    #[test]
    fn blank_schedules_are_backfilled() {
        let mut report = MigrationReport::default();
        let blob = canonicalize_blob(
            "mat101:1|CMP203:2:prog=FRI-16",
            &RecoveringTokenizer,
            &timetable(),
            &mut report,
        )
        .unwrap();
        assert_eq!(
            blob,
            "CMP203:2:vize=-;final=-;not=-;dev=-;prog=FRI-16|mat101:1:vize=-;final=-;not=-;dev=-;prog=MON-09,TUE-10"
        );
        assert_eq!(report.schedules_backfilled, 1);
    }

    #[test]
    fn output_is_sorted_by_identity_key() {
        let mut report = MigrationReport::default();
        let blob = canonicalize_blob(
            "MAT101:10|MAT101:2|BIL103:5",
            &RecoveringTokenizer,
            &NoSchedules,
            &mut report,
        )
        .unwrap();
        let order: Vec<&str> = blob.split('|').map(|t| &t[..t.find(":v").unwrap()]).collect();
        assert_eq!(order, vec!["BIL103:5", "MAT101:2", "MAT101:10"]);
    }
}
