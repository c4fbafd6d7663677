use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::errors::RegistrarError;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{check_semester, require_course, required_i64, required_str};
use crate::ipc::types::{AppState, Request};

/// Dropdown label for a subject. Lists are ordered by subject_code, so the
/// GUI's (label, id) pairs are stable across calls.
fn subject_label(code: &str, name: &str) -> String {
    format!("{} - {}", code, name)
}

fn courses_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let course_code = required_str(params, "courseCode")?;
    let course_name = required_str(params, "courseName")?;
    let duration_years = required_i64(params, "durationYears")?;
    let department = required_str(params, "department")?;

    if duration_years < 1 {
        return Err(RegistrarError::Validation(
            "durationYears must be at least 1".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO courses(id, course_code, course_name, duration_years, department)
         VALUES(?, ?, ?, ?, ?)",
        rusqlite::params![id, course_code, course_name, duration_years, department],
    )?;
    Ok(json!({ "courseId": id }))
}

fn courses_list(conn: &Connection) -> Result<serde_json::Value, RegistrarError> {
    let mut stmt = conn.prepare(
        "SELECT id, course_code, course_name, duration_years, department
         FROM courses
         ORDER BY course_name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let course_name: String = r.get(2)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "courseCode": r.get::<_, String>(1)?,
                "courseName": course_name.clone(),
                "durationYears": r.get::<_, i64>(3)?,
                "department": r.get::<_, String>(4)?,
                "label": course_name,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "courses": rows }))
}

fn subjects_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let subject_code = required_str(params, "subjectCode")?;
    let subject_name = required_str(params, "subjectName")?;
    let course_id = required_str(params, "courseId")?;
    let credits = required_i64(params, "credits")?;
    let semester = required_i64(params, "semester")?;

    if credits < 1 {
        return Err(RegistrarError::Validation(
            "credits must be at least 1".to_string(),
        ));
    }
    check_semester(semester)?;
    require_course(conn, &course_id)?;

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, subject_code, subject_name, course_id, credits, semester)
         VALUES(?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, subject_code, subject_name, course_id, credits, semester],
    )?;
    Ok(json!({ "subjectId": id }))
}

fn subjects_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let course_id = params
        .get("courseId")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<serde_json::Value> {
        let code: String = r.get(1)?;
        let name: String = r.get(2)?;
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "subjectCode": code.clone(),
            "subjectName": name.clone(),
            "courseId": r.get::<_, String>(3)?,
            "credits": r.get::<_, i64>(4)?,
            "semester": r.get::<_, i64>(5)?,
            "label": subject_label(&code, &name),
        }))
    };

    let rows = if let Some(course_id) = course_id.as_deref() {
        let mut stmt = conn.prepare(
            "SELECT id, subject_code, subject_name, course_id, credits, semester
             FROM subjects
             WHERE course_id = ?
             ORDER BY subject_code",
        )?;
        let collected = stmt
            .query_map([course_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        collected
    } else {
        let mut stmt = conn.prepare(
            "SELECT id, subject_code, subject_name, course_id, credits, semester
             FROM subjects
             ORDER BY subject_code",
        )?;
        let collected = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        collected
    };
    Ok(json!({ "subjects": rows }))
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match courses_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match courses_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match subjects_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match subjects_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.list" => Some(handle_courses_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        _ => None,
    }
}
