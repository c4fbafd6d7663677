use std::fmt;

/// Domain errors raised by the record store and the ledgers.
///
/// Each variant maps to a stable wire code so the GUI can branch on the
/// failure class without parsing messages.
#[derive(Debug)]
pub enum RegistrarError {
    /// Request params are missing or have the wrong shape.
    BadParams(String),
    /// An entity id or roll number resolved to no row.
    NotFound(String),
    /// Input is malformed or out of range (dates, semesters, mark bounds).
    Validation(String),
    /// A unique constraint was violated (username, roll number, codes).
    Duplicate(String),
    /// Credential or role mismatch.
    Auth(String),
    /// The backing store failed; never retried here.
    Store(String),
}

impl RegistrarError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistrarError::BadParams(_) => "bad_params",
            RegistrarError::NotFound(_) => "not_found",
            RegistrarError::Validation(_) => "validation",
            RegistrarError::Duplicate(_) => "duplicate",
            RegistrarError::Auth(_) => "auth_failed",
            RegistrarError::Store(_) => "store_failed",
        }
    }
}

impl fmt::Display for RegistrarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrarError::BadParams(m)
            | RegistrarError::NotFound(m)
            | RegistrarError::Validation(m)
            | RegistrarError::Duplicate(m)
            | RegistrarError::Auth(m)
            | RegistrarError::Store(m) => f.write_str(m),
        }
    }
}

impl std::error::Error for RegistrarError {}

impl From<rusqlite::Error> for RegistrarError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(cause, message) = &e {
            if cause.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| e.to_string());
                // SQLite reports both UNIQUE columns and non-rowid primary
                // keys as "UNIQUE constraint failed: table.column".
                if detail.contains("UNIQUE") {
                    return RegistrarError::Duplicate(detail);
                }
            }
        }
        RegistrarError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for RegistrarError {
    fn from(e: serde_json::Error) -> Self {
        RegistrarError::Store(e.to_string())
    }
}
