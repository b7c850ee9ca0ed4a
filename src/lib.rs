pub mod config;
pub mod db;
pub mod llm;
pub mod query;
pub mod sql;
pub mod util;
pub mod web;
