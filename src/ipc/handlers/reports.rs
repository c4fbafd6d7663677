use rusqlite::Connection;
use serde_json::json;

use crate::errors::RegistrarError;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::report;

fn student_performance(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RegistrarError> {
    let student_id = required_str(params, "studentId")?;
    let model = report::build_student_report(conn, &student_id)?;
    let value = serde_json::to_value(&model)?;
    Ok(json!({ "report": value }))
}

fn handle_student_performance(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match student_performance(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentPerformance" => Some(handle_student_performance(state, req)),
        _ => None,
    }
}
