/// Statement kinds a generated query may start with.
const ALLOWED_PREFIXES: [&str; 4] = ["select", "insert", "update", "delete"];

/// Substrings that reject a statement wherever they appear, string literals
/// included: destructive DDL and comment markers.
const DENY_LIST: [&str; 9] = [
    "drop table",
    "drop database",
    "truncate",
    "alter table",
    "create table",
    "create database",
    "--",
    "/*",
    "*/",
];

/// Coarse textual safety check for generated SQL.
///
/// Accepts a statement only if it starts with one of the four DML keywords,
/// has as many `(` as `)`, and contains no deny-listed substring. This is a
/// heuristic, not a parser: it rejects legitimate statements whose literals
/// contain a deny-listed word, and accepts syntactically broken SQL.
pub fn is_acceptable(sql: &str) -> bool {
    let lowered = sql.trim().to_lowercase();

    if !ALLOWED_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return false;
    }

    if sql.matches('(').count() != sql.matches(')').count() {
        return false;
    }

    !DENY_LIST.iter().any(|pattern| lowered.contains(pattern))
}
