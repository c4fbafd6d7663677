use rusqlite::Connection;

use crate::errors::RegistrarError;

/// Session statuses recognized by the attendance ledger. Absent and Leave
/// both count toward the session total but not toward presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "leave" => Some(AttendanceStatus::Leave),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Leave => "Leave",
        }
    }
}

/// Two-decimal half-up rounding used for attendance percentages:
/// floor(100*x + 0.5) / 100.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// Letter bands with inclusive lower percentage bounds, checked top-down.
const GRADE_BANDS: [(f64, &str); 6] = [
    (90.0, "A+"),
    (80.0, "A"),
    (70.0, "B+"),
    (60.0, "B"),
    (50.0, "C"),
    (40.0, "D"),
];

/// Letter grade for a score. Depends only on the ratio, so scaling marks
/// and maximum together never changes the grade. Callers guarantee
/// max_marks > 0.
pub fn letter_grade(marks_obtained: f64, max_marks: f64) -> &'static str {
    let percentage = marks_obtained / max_marks * 100.0;
    for (floor, grade) in GRADE_BANDS {
        if percentage >= floor {
            return grade;
        }
    }
    "F"
}

/// Present sessions as a percentage of all sessions. Zero sessions yield
/// exactly 0.0 — a zero-default, not "100% of nothing".
pub fn percentage_from_counts(present: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round_off_2_decimals(present as f64 / total as f64 * 100.0)
}

pub fn attendance_percentage(
    conn: &Connection,
    student_id: &str,
    subject_id: &str,
) -> Result<f64, RegistrarError> {
    let (total, present): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), SUM(CASE WHEN status = 'Present' THEN 1 ELSE 0 END)
         FROM attendance
         WHERE student_id = ? AND subject_id = ?",
        (student_id, subject_id),
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(percentage_from_counts(present.unwrap_or(0), total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries_are_inclusive_lower_bounds() {
        assert_eq!(letter_grade(90.0, 100.0), "A+");
        assert_eq!(letter_grade(89.99, 100.0), "A");
        assert_eq!(letter_grade(80.0, 100.0), "A");
        assert_eq!(letter_grade(79.99, 100.0), "B+");
        assert_eq!(letter_grade(70.0, 100.0), "B+");
        assert_eq!(letter_grade(60.0, 100.0), "B");
        assert_eq!(letter_grade(50.0, 100.0), "C");
        assert_eq!(letter_grade(40.0, 100.0), "D");
        assert_eq!(letter_grade(39.99, 100.0), "F");
        assert_eq!(letter_grade(0.0, 100.0), "F");
    }

    #[test]
    fn grade_depends_only_on_the_ratio() {
        for (marks, max) in [(45.0, 50.0), (9.0, 10.0), (180.0, 200.0)] {
            assert_eq!(letter_grade(marks, max), "A+");
        }
        assert_eq!(letter_grade(42.0, 50.0), letter_grade(84.0, 100.0));
        assert_eq!(letter_grade(21.0, 60.0), letter_grade(35.0, 100.0));
    }

    #[test]
    fn percentage_rounds_half_up_to_two_decimals() {
        assert_eq!(percentage_from_counts(2, 3), 66.67);
        assert_eq!(percentage_from_counts(3, 4), 75.0);
        assert_eq!(percentage_from_counts(1, 3), 33.33);
        assert_eq!(percentage_from_counts(4, 4), 100.0);
    }

    #[test]
    fn zero_sessions_is_exactly_zero() {
        assert_eq!(percentage_from_counts(0, 0), 0.0);
        assert_eq!(percentage_from_counts(5, 0), 0.0);
    }

    #[test]
    fn round_off_examples() {
        assert_eq!(round_off_2_decimals(66.666_666_666), 66.67);
        assert_eq!(round_off_2_decimals(12.344), 12.34);
        assert_eq!(round_off_2_decimals(12.345), 12.35);
        assert_eq!(round_off_2_decimals(0.0), 0.0);
    }

    #[test]
    fn status_parse_accepts_any_case_and_stores_canonical_names() {
        assert_eq!(AttendanceStatus::parse("present"), Some(AttendanceStatus::Present));
        assert_eq!(AttendanceStatus::parse("ABSENT"), Some(AttendanceStatus::Absent));
        assert_eq!(AttendanceStatus::parse(" Leave "), Some(AttendanceStatus::Leave));
        assert_eq!(AttendanceStatus::parse("tardy"), None);
        assert_eq!(AttendanceStatus::Present.as_str(), "Present");
        assert_eq!(AttendanceStatus::Absent.as_str(), "Absent");
        assert_eq!(AttendanceStatus::Leave.as_str(), "Leave");
    }
}
