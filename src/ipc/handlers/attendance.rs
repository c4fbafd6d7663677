use rusqlite::Connection;
use serde_json::json;

use crate::errors::RegistrarError;
use crate::grading::{self, AttendanceStatus};
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{
    parse_iso_date, require_faculty, require_student, require_subject, required_str,
};
use crate::ipc::types::{AppState, Request};

/// One row per (student, subject, date); marking the same day again
/// replaces status and marker in place. The conditional write is a single
/// statement so two concurrent marks can never produce two rows.
fn attendance_mark(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let subject_id = required_str(params, "subjectId")?;
    let date_raw = required_str(params, "date")?;
    let status_raw = required_str(params, "status")?;
    let marked_by = required_str(params, "markedBy")?;

    let date = parse_iso_date(&date_raw, "date")?;
    let Some(status) = AttendanceStatus::parse(&status_raw) else {
        return Err(RegistrarError::Validation(
            "status must be Present, Absent, or Leave".to_string(),
        ));
    };
    require_student(conn, &student_id)?;
    require_subject(conn, &subject_id)?;
    require_faculty(conn, &marked_by)?;

    conn.execute(
        "INSERT INTO attendance(student_id, subject_id, attendance_date, status, marked_by)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id, attendance_date) DO UPDATE SET
           status = excluded.status,
           marked_by = excluded.marked_by",
        (&student_id, &subject_id, &date, status.as_str(), &marked_by),
    )?;
    Ok(json!({ "ok": true }))
}

fn attendance_list(
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
            "date": r.get::<_, String>(0)?,
            "status": r.get::<_, String>(1)?,
            "markedBy": r.get::<_, String>(2)?,
            "subjectId": r.get::<_, String>(3)?,
            "subjectName": r.get::<_, String>(4)?,
        }))
    };

    let records = if let Some(subject_id) = subject_id.as_deref() {
        let mut stmt = conn.prepare(
            "SELECT a.attendance_date, a.status, a.marked_by, a.subject_id, sub.subject_name
             FROM attendance a
             JOIN subjects sub ON a.subject_id = sub.id
             WHERE a.student_id = ? AND a.subject_id = ?
             ORDER BY a.attendance_date DESC",
        )?;
        let rows = stmt
            .query_map((&student_id, subject_id), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    } else {
        let mut stmt = conn.prepare(
            "SELECT a.attendance_date, a.status, a.marked_by, a.subject_id, sub.subject_name
             FROM attendance a
             JOIN subjects sub ON a.subject_id = sub.id
             WHERE a.student_id = ?
             ORDER BY a.attendance_date DESC",
        )?;
        let rows = stmt
            .query_map([&student_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    Ok(json!({ "records": records }))
}

fn attendance_percentage(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let subject_id = required_str(params, "subjectId")?;
    let percentage = grading::attendance_percentage(conn, &student_id, &subject_id)?;
    Ok(json!({ "percentage": percentage }))
}

fn handle_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_mark(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_percentage(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_percentage(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_mark(state, req)),
        "attendance.list" => Some(handle_list(state, req)),
        "attendance.percentage" => Some(handle_percentage(state, req)),
        _ => None,
    }
}
