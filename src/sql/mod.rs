//! Text-level handling of model output: cleanup and the safety gate applied
//! before anything reaches the database.
pub mod sanitize;
pub mod validate;

pub use sanitize::clean_sql;
pub use validate::is_acceptable;
