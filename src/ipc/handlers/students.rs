use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, PasswordHasher, Role};
use crate::errors::RegistrarError;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{
    check_contact, check_semester, optional_str, parse_iso_date, require_course, required_i64,
    required_str, required_str_raw, today_iso,
};
use crate::ipc::types::{AppState, Request};

const STUDENT_COLUMNS: &str = "s.id, s.user_id, s.roll_number, s.name, s.email, s.phone,
    s.date_of_birth, s.gender, s.address, s.course_id, s.semester,
    s.enrollment_date, s.status, c.course_name, u.username";

#[derive(Debug)]
struct StudentRow {
    id: String,
    user_id: String,
    roll_number: String,
    name: String,
    email: String,
    phone: String,
    date_of_birth: Option<String>,
    gender: Option<String>,
    address: Option<String>,
    course_id: String,
    semester: i64,
    enrollment_date: String,
    status: String,
    course_name: Option<String>,
    username: Option<String>,
}

fn map_student_row(r: &Row) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        id: r.get(0)?,
        user_id: r.get(1)?,
        roll_number: r.get(2)?,
        name: r.get(3)?,
        email: r.get(4)?,
        phone: r.get(5)?,
        date_of_birth: r.get(6)?,
        gender: r.get(7)?,
        address: r.get(8)?,
        course_id: r.get(9)?,
        semester: r.get(10)?,
        enrollment_date: r.get(11)?,
        status: r.get(12)?,
        course_name: r.get(13)?,
        username: r.get(14)?,
    })
}

fn student_json(s: &StudentRow) -> serde_json::Value {
    json!({
        "id": s.id,
        "userId": s.user_id,
        "rollNumber": s.roll_number,
        "name": s.name,
        "email": s.email,
        "phone": s.phone,
        "dateOfBirth": s.date_of_birth,
        "gender": s.gender,
        "address": s.address,
        "courseId": s.course_id,
        "semester": s.semester,
        "enrollmentDate": s.enrollment_date,
        "status": s.status,
        "courseName": s.course_name,
        "username": s.username,
    })
}

fn student_by(
    conn: &Connection,
    where_clause: &str,
    key: &str,
) -> Result<StudentRow, RegistrarError> {
    conn.query_row(
        &format!(
            "SELECT {STUDENT_COLUMNS}
             FROM students s
             LEFT JOIN courses c ON s.course_id = c.id
             LEFT JOIN users u ON s.user_id = u.id
             WHERE {where_clause}"
        ),
        [key],
        map_student_row,
    )
    .optional()?
    .ok_or_else(|| RegistrarError::NotFound("student not found".to_string()))
}

/// Registers a student: the login user and the record row are one
/// transaction, so a duplicate roll number also rolls the user back.
fn students_create(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let username = required_str(params, "username")?;
    let password = required_str_raw(params, "password")?;
    let roll_number = required_str(params, "rollNumber")?;
    let name = required_str(params, "name")?;
    let email = required_str(params, "email")?;
    let phone = required_str(params, "phone")?;
    let course_id = required_str(params, "courseId")?;
    let semester = required_i64(params, "semester")?;
    let date_of_birth = match optional_str(params, "dateOfBirth") {
        Some(raw) => Some(parse_iso_date(&raw, "dateOfBirth")?),
        None => None,
    };
    let gender = optional_str(params, "gender");
    let address = optional_str(params, "address");

    check_contact(&email, &phone)?;
    check_semester(semester)?;
    require_course(conn, &course_id)?;

    let tx = conn.unchecked_transaction()?;
    let user_id = auth::create_user(&tx, hasher, &username, &password, Role::Student)?;
    let student_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO students(id, user_id, roll_number, name, email, phone,
                              date_of_birth, gender, address, course_id, semester,
                              enrollment_date, status)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Active')",
        rusqlite::params![
            student_id,
            user_id,
            roll_number,
            name,
            email,
            phone,
            date_of_birth,
            gender,
            address,
            course_id,
            semester,
            today_iso(),
        ],
    )?;
    tx.commit()?;

    Ok(json!({ "studentId": student_id, "userId": user_id }))
}

fn students_list(conn: &Connection) -> Result<serde_json::Value, RegistrarError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDENT_COLUMNS}
         FROM students s
         LEFT JOIN courses c ON s.course_id = c.id
         LEFT JOIN users u ON s.user_id = u.id
         WHERE s.status = 'Active'
         ORDER BY s.roll_number"
    ))?;
    let rows = stmt
        .query_map([], |r| map_student_row(r))?
        .collect::<Result<Vec<_>, _>>()?;
    let students: Vec<serde_json::Value> = rows.iter().map(student_json).collect();
    Ok(json!({ "students": students }))
}

fn students_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let row = student_by(conn, "s.id = ?", &student_id)?;
    Ok(json!({ "student": student_json(&row) }))
}

fn students_get_by_roll(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let roll_number = required_str(params, "rollNumber")?;
    let row = student_by(conn, "s.roll_number = ?", &roll_number)?;
    Ok(json!({ "student": student_json(&row) }))
}

fn students_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let name = required_str(params, "name")?;
    let email = required_str(params, "email")?;
    let phone = required_str(params, "phone")?;
    let address = optional_str(params, "address");
    let semester = required_i64(params, "semester")?;

    check_contact(&email, &phone)?;
    check_semester(semester)?;

    let updated = conn.execute(
        "UPDATE students SET name = ?, email = ?, phone = ?, address = ?, semester = ?
         WHERE id = ?",
        rusqlite::params![name, email, phone, address, semester, student_id],
    )?;
    if updated == 0 {
        return Err(RegistrarError::NotFound("student not found".to_string()));
    }
    Ok(json!({ "ok": true }))
}

/// Lifecycle is one-way: Active -> Inactive, no reactivate method. Running
/// it again on an Inactive student is a no-op success.
fn students_deactivate(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let updated = conn.execute(
        "UPDATE students SET status = 'Inactive' WHERE id = ?",
        [&student_id],
    )?;
    if updated == 0 {
        return Err(RegistrarError::NotFound("student not found".to_string()));
    }
    Ok(json!({ "ok": true }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_create(conn, state.hasher.as_ref(), &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_get(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_get_by_roll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_get_by_roll(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_deactivate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_deactivate(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_create(state, req)),
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.getByRoll" => Some(handle_get_by_roll(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.deactivate" => Some(handle_deactivate(state, req)),
        _ => None,
    }
}
