use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::errors::RegistrarError;

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, RegistrarError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RegistrarError::BadParams(format!("missing {}", key)))
}

pub fn required_i64(params: &serde_json::Value, key: &str) -> Result<i64, RegistrarError> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RegistrarError::BadParams(format!("missing {}", key)))
}

pub fn required_f64(params: &serde_json::Value, key: &str) -> Result<f64, RegistrarError> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| RegistrarError::BadParams(format!("missing {}", key)))
}

/// Like required_str but keeps whitespace. Passwords digest exactly as
/// typed.
pub fn required_str_raw(params: &serde_json::Value, key: &str) -> Result<String, RegistrarError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RegistrarError::BadParams(format!("missing {}", key)))
}

/// Absent, null, or blank values all read as None.
pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Loose shape check: an @ and a dot somewhere.
pub fn valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// Exactly ten ASCII digits.
pub fn valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

/// Parses YYYY-MM-DD and returns the canonical zero-padded form, so stored
/// dates order lexicographically.
pub fn parse_iso_date(value: &str, field: &str) -> Result<String, RegistrarError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|d| d.to_string())
        .map_err(|_| RegistrarError::Validation(format!("{} must be YYYY-MM-DD", field)))
}

pub fn today_iso() -> String {
    chrono::Local::now().date_naive().to_string()
}

pub fn check_contact(email: &str, phone: &str) -> Result<(), RegistrarError> {
    if !valid_email(email) {
        return Err(RegistrarError::Validation(
            "email address looks invalid".to_string(),
        ));
    }
    if !valid_phone(phone) {
        return Err(RegistrarError::Validation(
            "phone must be exactly 10 digits".to_string(),
        ));
    }
    Ok(())
}

pub fn check_semester(semester: i64) -> Result<(), RegistrarError> {
    if (1..=8).contains(&semester) {
        Ok(())
    } else {
        Err(RegistrarError::Validation(
            "semester must be between 1 and 8".to_string(),
        ))
    }
}

pub fn require_student(conn: &Connection, id: &str) -> Result<(), RegistrarError> {
    require_row(conn, "SELECT 1 FROM students WHERE id = ?", id, "student not found")
}

pub fn require_subject(conn: &Connection, id: &str) -> Result<(), RegistrarError> {
    require_row(conn, "SELECT 1 FROM subjects WHERE id = ?", id, "subject not found")
}

pub fn require_course(conn: &Connection, id: &str) -> Result<(), RegistrarError> {
    require_row(conn, "SELECT 1 FROM courses WHERE id = ?", id, "course not found")
}

pub fn require_faculty(conn: &Connection, id: &str) -> Result<(), RegistrarError> {
    require_row(conn, "SELECT 1 FROM faculty WHERE id = ?", id, "faculty not found")
}

fn require_row(
    conn: &Connection,
    sql: &str,
    id: &str,
    missing: &str,
) -> Result<(), RegistrarError> {
    let found = conn
        .query_row(sql, [id], |r| r.get::<_, i64>(0))
        .optional()?
        .is_some();
    if found {
        Ok(())
    } else {
        Err(RegistrarError::NotFound(missing.to_string()))
    }
}
