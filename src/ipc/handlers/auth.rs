use rusqlite::Connection;
use serde_json::json;

use crate::auth::{self, PasswordHasher, Role};
use crate::errors::RegistrarError;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{required_str, required_str_raw};
use crate::ipc::types::{AppState, Request};

fn parse_role(params: &serde_json::Value) -> Result<Role, RegistrarError> {
    let raw = required_str(params, "role")?;
    Role::parse(&raw).ok_or_else(|| {
        RegistrarError::Validation("role must be admin, faculty, or student".to_string())
    })
}

fn auth_login(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let username = required_str(params, "username")?;
    let password = required_str_raw(params, "password")?;
    let role = parse_role(params)?;

    let user = auth::verify_login(conn, hasher, &username, &password, role)?;
    let profile = auth::role_profile(conn, &user)?;
    Ok(json!({
        "userId": user.user_id,
        "username": user.username,
        "role": user.role,
        "profile": profile,
    }))
}

fn auth_create_user(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let username = required_str(params, "username")?;
    let password = required_str_raw(params, "password")?;
    let role = parse_role(params)?;

    let user_id = auth::create_user(conn, hasher, &username, &password, role)?;
    Ok(json!({ "userId": user_id }))
}

fn auth_change_password(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let user_id = required_str(params, "userId")?;
    let old_password = required_str_raw(params, "oldPassword")?;
    let new_password = required_str_raw(params, "newPassword")?;

    auth::change_password(conn, hasher, &user_id, &old_password, &new_password)?;
    Ok(json!({ "ok": true }))
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match auth_login(conn, state.hasher.as_ref(), &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_create_user(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match auth_create_user(conn, state.hasher.as_ref(), &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_change_password(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match auth_change_password(conn, state.hasher.as_ref(), &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.createUser" => Some(handle_create_user(state, req)),
        "auth.changePassword" => Some(handle_change_password(state, req)),
        _ => None,
    }
}
