use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::RegistrarError;

/// One-way password digest used by the identity store.
///
/// Stored hashes must keep verifying across releases, so replacing the
/// scheme means migrating every stored digest along with the
/// implementation. Callers only ever compare digest equality.
pub trait PasswordHasher {
    fn digest(&self, password: &str) -> String;
}

/// Single-round unsalted SHA-256 hex digest. Weak by modern standards but
/// byte-compatible with the hashes already on disk.
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn digest(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "faculty" => Some(Role::Faculty),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

pub fn create_user(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    username: &str,
    password: &str,
    role: Role,
) -> Result<String, RegistrarError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RegistrarError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(RegistrarError::Validation(
            "password must not be empty".to_string(),
        ));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users(id, username, password_hash, role) VALUES(?, ?, ?, ?)",
        (&id, username, &hasher.digest(password), role.as_str()),
    )?;
    Ok(id)
}

/// Username, password, and requested role must all match; a role mismatch
/// reads the same as wrong credentials.
pub fn verify_login(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    username: &str,
    password: &str,
    role: Role,
) -> Result<UserRecord, RegistrarError> {
    let found = conn
        .query_row(
            "SELECT id, username, role FROM users WHERE username = ? AND password_hash = ?",
            (username.trim(), &hasher.digest(password)),
            |r| {
                Ok(UserRecord {
                    user_id: r.get(0)?,
                    username: r.get(1)?,
                    role: r.get(2)?,
                })
            },
        )
        .optional()?;
    match found {
        Some(user) if user.role == role.as_str() => Ok(user),
        _ => Err(RegistrarError::Auth(
            "invalid username, password, or role".to_string(),
        )),
    }
}

pub fn change_password(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    user_id: &str,
    old_password: &str,
    new_password: &str,
) -> Result<(), RegistrarError> {
    if new_password.is_empty() {
        return Err(RegistrarError::Validation(
            "new password must not be empty".to_string(),
        ));
    }
    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?",
            [user_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(stored) = stored else {
        return Err(RegistrarError::NotFound("user not found".to_string()));
    };
    if stored != hasher.digest(old_password) {
        return Err(RegistrarError::Auth(
            "current password does not match".to_string(),
        ));
    }
    conn.execute(
        "UPDATE users SET password_hash = ? WHERE id = ?",
        (&hasher.digest(new_password), user_id),
    )?;
    Ok(())
}

/// Role-specific profile row shown after login: student and faculty users
/// carry their record store row, admins have none.
pub fn role_profile(
    conn: &Connection,
    user: &UserRecord,
) -> Result<Option<serde_json::Value>, RegistrarError> {
    match user.role.as_str() {
        "student" => {
            let row = conn
                .query_row(
                    "SELECT s.id, s.roll_number, s.name, s.semester, s.status, c.course_name
                     FROM students s
                     LEFT JOIN courses c ON s.course_id = c.id
                     WHERE s.user_id = ?",
                    [&user.user_id],
                    |r| {
                        Ok(json!({
                            "studentId": r.get::<_, String>(0)?,
                            "rollNumber": r.get::<_, String>(1)?,
                            "name": r.get::<_, String>(2)?,
                            "semester": r.get::<_, i64>(3)?,
                            "status": r.get::<_, String>(4)?,
                            "courseName": r.get::<_, Option<String>>(5)?,
                        }))
                    },
                )
                .optional()?;
            Ok(row)
        }
        "faculty" => {
            let row = conn
                .query_row(
                    "SELECT id, faculty_code, name, department, designation
                     FROM faculty
                     WHERE user_id = ?",
                    [&user.user_id],
                    |r| {
                        Ok(json!({
                            "facultyId": r.get::<_, String>(0)?,
                            "facultyCode": r.get::<_, String>(1)?,
                            "name": r.get::<_, String>(2)?,
                            "department": r.get::<_, String>(3)?,
                            "designation": r.get::<_, String>(4)?,
                        }))
                    },
                )
                .optional()?;
            Ok(row)
        }
        _ => Ok(None),
    }
}
