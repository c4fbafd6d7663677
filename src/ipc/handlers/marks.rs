use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::errors::RegistrarError;
use crate::grading;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{
    require_faculty, require_student, require_subject, required_f64, required_str,
};
use crate::ipc::types::{AppState, Request};

/// Appends a score row with its derived grade. The ledger is append-only:
/// re-entering the same exam type adds a second row rather than replacing
/// the first, and exam-type uniqueness is left to the caller.
fn marks_add(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let subject_id = required_str(params, "subjectId")?;
    let exam_type = required_str(params, "examType")?;
    let marks_obtained = required_f64(params, "marksObtained")?;
    let max_marks = required_f64(params, "maxMarks")?;
    let entered_by = required_str(params, "enteredBy")?;

    if max_marks <= 0.0 {
        return Err(RegistrarError::Validation(
            "maxMarks must be greater than zero".to_string(),
        ));
    }
    if marks_obtained < 0.0 {
        return Err(RegistrarError::Validation(
            "negative marks are not allowed".to_string(),
        ));
    }
    if marks_obtained > max_marks {
        return Err(RegistrarError::Validation(
            "marksObtained cannot exceed maxMarks".to_string(),
        ));
    }
    require_student(conn, &student_id)?;
    require_subject(conn, &subject_id)?;
    require_faculty(conn, &entered_by)?;

    let grade = grading::letter_grade(marks_obtained, max_marks);
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO marks(id, student_id, subject_id, exam_type, marks_obtained,
                           max_marks, grade, entered_by)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            student_id,
            subject_id,
            exam_type,
            marks_obtained,
            max_marks,
            grade,
            entered_by,
        ],
    )?;
    Ok(json!({ "markId": id, "grade": grade }))
}

fn marks_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let subject_id = params
        .get("subjectId")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<serde_json::Value> {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "subjectId": r.get::<_, String>(1)?,
            "subjectName": r.get::<_, String>(2)?,
            "examType": r.get::<_, String>(3)?,
            "marksObtained": r.get::<_, f64>(4)?,
            "maxMarks": r.get::<_, f64>(5)?,
            "grade": r.get::<_, String>(6)?,
            "enteredBy": r.get::<_, String>(7)?,
        }))
    };

    // Entry order, never re-sorted.
    let marks = if let Some(subject_id) = subject_id.as_deref() {
        let mut stmt = conn.prepare(
            "SELECT m.id, m.subject_id, sub.subject_name, m.exam_type, m.marks_obtained,
                    m.max_marks, m.grade, m.entered_by
             FROM marks m
             JOIN subjects sub ON m.subject_id = sub.id
             WHERE m.student_id = ? AND m.subject_id = ?
             ORDER BY m.rowid",
        )?;
        let rows = stmt
            .query_map((&student_id, subject_id), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    } else {
        let mut stmt = conn.prepare(
            "SELECT m.id, m.subject_id, sub.subject_name, m.exam_type, m.marks_obtained,
                    m.max_marks, m.grade, m.entered_by
             FROM marks m
             JOIN subjects sub ON m.subject_id = sub.id
             WHERE m.student_id = ?
             ORDER BY m.rowid",
        )?;
        let rows = stmt
            .query_map([&student_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    Ok(json!({ "marks": marks }))
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match marks_add(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match marks_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.add" => Some(handle_add(state, req)),
        "marks.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
