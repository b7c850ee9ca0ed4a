use duckdb::Connection;
use r2d2::ManageConnection;
use std::sync::Mutex;

/// Hands out clones of a single base connection so every pooled connection
/// talks to the same DuckDB instance (including `:memory:` databases).
pub struct DuckDBConnectionManager {
    base: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String) -> Result<Self, duckdb::Error> {
        let base = if connection_string == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&connection_string)?
        };

        Ok(Self {
            base: Mutex::new(base),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let base = self.base.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        base.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
