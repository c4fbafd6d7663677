pub mod attendance;
pub mod auth;
pub mod backup;
pub mod catalog;
pub mod core;
pub mod faculty;
pub mod marks;
pub mod reports;
pub mod students;
