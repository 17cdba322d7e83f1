use crate::model::EnrollmentRecord;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPolicy {
    pub midterm_weight: f64,
    pub final_weight: f64,
    /// More absences than this fails the course regardless of scores.
    pub absence_limit: u32,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            midterm_weight: 0.40,
            final_weight: 0.60,
            absence_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    AA,
    BA,
    BB,
    CB,
    FF,
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Passed,
    FailedGrade,
    FailedAttendance,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Pending => "pending",
            Outcome::Passed => "passed",
            Outcome::FailedGrade => "failed (FF)",
            Outcome::FailedAttendance => "failed (absences)",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseResult {
    pub average: Option<f64>,
    pub letter: Option<Letter>,
    pub outcome: Outcome,
}

/// 100-point average to the 4-point scale.
pub fn four_point(average: f64) -> f64 {
    match average {
        a if a >= 90.0 => 4.0,
        a if a >= 85.0 => 3.5,
        a if a >= 80.0 => 3.0,
        a if a >= 75.0 => 2.5,
        a if a >= 70.0 => 2.0,
        a if a >= 65.0 => 1.5,
        a if a >= 60.0 => 1.0,
        a if a >= 50.0 => 0.5,
        _ => 0.0,
    }
}

pub fn letter(average: f64) -> Letter {
    match four_point(average) {
        g if g >= 3.5 => Letter::AA,
        g if g >= 3.0 => Letter::BA,
        g if g >= 2.5 => Letter::BB,
        g if g >= 2.0 => Letter::CB,
        _ => Letter::FF,
    }
}

impl GradingPolicy {
    pub fn average(&self, midterm: Option<u8>, final_score: Option<u8>) -> Option<f64> {
        let (m, f) = (midterm?, final_score?);
        Some(f64::from(m) * self.midterm_weight + f64::from(f) * self.final_weight)
    }

    /// Rounded average stored in the legacy grade field.
    pub fn legacy_grade(&self, midterm: u8, final_score: u8) -> u8 {
        self.average(Some(midterm), Some(final_score))
            .map(|a| a.round().clamp(0.0, 100.0) as u8)
            .unwrap_or_default()
    }

    pub fn evaluate(&self, record: &EnrollmentRecord) -> CourseResult {
        let average = self.average(record.midterm, record.final_score);
        let letter = average.map(letter);
        let over_limit = record.absences.is_some_and(|a| a > self.absence_limit);

        let outcome = if over_limit {
            Outcome::FailedAttendance
        } else {
            match letter {
                None => Outcome::Pending,
                Some(Letter::FF) => Outcome::FailedGrade,
                Some(_) => Outcome::Passed,
            }
        };
        CourseResult {
            average,
            letter,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(midterm: u8, final_score: u8, absences: Option<u32>) -> EnrollmentRecord {
        let mut r = EnrollmentRecord::new("MAT101", 1);
        r.midterm = Some(midterm);
        r.final_score = Some(final_score);
        r.absences = absences;
        r
    }

    #[test]
    fn weighted_average_and_letter() {
        let policy = GradingPolicy::default();
        let result = policy.evaluate(&graded(80, 90, Some(0)));
        assert!((result.average.unwrap() - 86.0).abs() < 1e-9);
        assert_eq!(result.letter, Some(Letter::AA));
        assert_eq!(result.outcome, Outcome::Passed);
        assert_eq!(policy.legacy_grade(80, 90), 86);
    }

    #[test]
    fn below_two_point_fails() {
        let policy = GradingPolicy::default();
        assert_eq!(letter(69.9), Letter::FF);
        assert_eq!(letter(70.0), Letter::CB);
        assert_eq!(policy.evaluate(&graded(50, 60, None)).outcome, Outcome::FailedGrade);
    }

    #[test]
    fn absences_override_scores() {
        let policy = GradingPolicy::default();
        assert_eq!(policy.evaluate(&graded(100, 100, Some(4))).outcome, Outcome::FailedAttendance);
        assert_eq!(policy.evaluate(&graded(100, 100, Some(3))).outcome, Outcome::Passed);
    }

    #[test]
    fn missing_score_is_pending() {
        let policy = GradingPolicy::default();
        let mut r = EnrollmentRecord::new("MAT101", 1);
        r.midterm = Some(90);
        let result = policy.evaluate(&r);
        assert_eq!(result.average, None);
        assert_eq!(result.outcome, Outcome::Pending);
    }
}
