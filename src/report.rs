use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::errors::RegistrarError;
use crate::grading;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStudent {
    pub student_id: String,
    pub roll_number: String,
    pub name: String,
    pub course_name: Option<String>,
    pub semester: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLine {
    pub subject_id: String,
    pub subject_name: String,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamLine {
    pub exam_type: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub grade: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMarks {
    pub subject_id: String,
    pub subject_name: String,
    pub exams: Vec<ExamLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: ReportStudent,
    pub attendance: Vec<AttendanceLine>,
    pub marks: Vec<SubjectMarks>,
}

/// Read-only performance summary for one student: identity fields,
/// per-subject attendance, and exam history grouped by subject.
///
/// Subjects whose attendance percentage is exactly 0 (no sessions, or an
/// all-absent history that rounds to 0.0) are left out of the attendance
/// section. Marks groups keep first-entry order.
pub fn build_student_report(
    conn: &Connection,
    student_id: &str,
) -> Result<StudentReport, RegistrarError> {
    let student = conn
        .query_row(
            "SELECT s.id, s.roll_number, s.name, c.course_name, s.semester, s.status
             FROM students s
             LEFT JOIN courses c ON s.course_id = c.id
             WHERE s.id = ?",
            [student_id],
            |r| {
                Ok(ReportStudent {
                    student_id: r.get(0)?,
                    roll_number: r.get(1)?,
                    name: r.get(2)?,
                    course_name: r.get(3)?,
                    semester: r.get(4)?,
                    status: r.get(5)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| RegistrarError::NotFound("student not found".to_string()))?;

    let mut attendance = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT a.subject_id, sub.subject_name, COUNT(*),
                SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END)
         FROM attendance a
         JOIN subjects sub ON a.subject_id = sub.id
         WHERE a.student_id = ?
         GROUP BY a.subject_id, sub.subject_name
         ORDER BY sub.subject_code",
    )?;
    let tallies = stmt
        .query_map([student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, Option<i64>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (subject_id, subject_name, total, present) in tallies {
        let percentage = grading::percentage_from_counts(present.unwrap_or(0), total);
        if percentage > 0.0 {
            attendance.push(AttendanceLine {
                subject_id,
                subject_name,
                percentage,
            });
        }
    }

    let mut marks: Vec<SubjectMarks> = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT m.subject_id, sub.subject_name, m.exam_type, m.marks_obtained,
                m.max_marks, m.grade
         FROM marks m
         JOIN subjects sub ON m.subject_id = sub.id
         WHERE m.student_id = ?
         ORDER BY m.rowid",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                ExamLine {
                    exam_type: r.get(2)?,
                    marks_obtained: r.get(3)?,
                    max_marks: r.get(4)?,
                    grade: r.get(5)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (subject_id, subject_name, exam) in rows {
        match marks.iter_mut().find(|g| g.subject_id == subject_id) {
            Some(group) => group.exams.push(exam),
            None => marks.push(SubjectMarks {
                subject_id,
                subject_name,
                exams: vec![exam],
            }),
        }
    }

    Ok(StudentReport {
        student,
        attendance,
        marks,
    })
}
