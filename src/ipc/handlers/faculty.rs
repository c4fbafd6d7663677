use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, PasswordHasher, Role};
use crate::errors::RegistrarError;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{check_contact, required_str, required_str_raw};
use crate::ipc::types::{AppState, Request};

fn faculty_create(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let username = required_str(params, "username")?;
    let password = required_str_raw(params, "password")?;
    let faculty_code = required_str(params, "facultyCode")?;
    let name = required_str(params, "name")?;
    let email = required_str(params, "email")?;
    let phone = required_str(params, "phone")?;
    let department = required_str(params, "department")?;
    let designation = required_str(params, "designation")?;

    check_contact(&email, &phone)?;

    let tx = conn.unchecked_transaction()?;
    let user_id = auth::create_user(&tx, hasher, &username, &password, Role::Faculty)?;
    let faculty_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO faculty(id, user_id, faculty_code, name, email, phone,
                             department, designation)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            faculty_id,
            user_id,
            faculty_code,
            name,
            email,
            phone,
            department,
            designation,
        ],
    )?;
    tx.commit()?;

    Ok(json!({ "facultyId": faculty_id, "userId": user_id }))
}

fn faculty_list(conn: &Connection) -> Result<serde_json::Value, RegistrarError> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.user_id, f.faculty_code, f.name, f.email, f.phone,
                f.department, f.designation, u.username
         FROM faculty f
         LEFT JOIN users u ON f.user_id = u.id
         ORDER BY f.faculty_code",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "userId": r.get::<_, String>(1)?,
                "facultyCode": r.get::<_, String>(2)?,
                "name": r.get::<_, String>(3)?,
                "email": r.get::<_, String>(4)?,
                "phone": r.get::<_, String>(5)?,
                "department": r.get::<_, String>(6)?,
                "designation": r.get::<_, String>(7)?,
                "username": r.get::<_, Option<String>>(8)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "faculty": rows }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match faculty_create(conn, state.hasher.as_ref(), &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match faculty_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "faculty.create" => Some(handle_create(state, req)),
        "faculty.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
