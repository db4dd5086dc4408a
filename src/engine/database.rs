//! BridgeDB Database Module
//! SQLite parent store with connection pooling

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

use super::model::User;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database pool: {0}")]
    PoolError(#[from] r2d2::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Database file not found: {0}")]
    NotFound(String),
}

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an existing database file without creating it
    pub fn open(db_path: &Path) -> Result<Self, DatabaseError> {
        if !db_path.exists() {
            return Err(DatabaseError::NotFound(db_path.display().to_string()));
        }
        Self::new(db_path)
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory();
        // Each connection is its own database; it must never be recycled
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.pool.get()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                special_action_id TEXT
            )",
            [],
        )?;

        // PRAGMA returns a row, so it has to go through query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Ok(())
    }

    pub fn get_connection(&self) -> Result<DbConnection, DatabaseError> {
        Ok(self.pool.get()?)
    }

    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO users (id, name, special_action_id) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, user.special_action_id],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let conn = self.get_connection()?;
        let user = conn
            .query_row(
                "SELECT id, name, special_action_id FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare("SELECT id, name, special_action_id FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<User>, _>>()?;
        Ok(users)
    }

    pub fn count_users(&self) -> Result<usize, DatabaseError> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        special_action_id: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_user_roundtrip_in_memory() {
        let db = Database::in_memory().unwrap();
        db.insert_user(&User::new(1, "alice").with_special_action("r2")).unwrap();
        db.insert_user(&User::new(2, "bob")).unwrap();

        let alice = db.get_user(1).unwrap().unwrap();
        assert_eq!(alice.special_action_id.as_deref(), Some("r2"));
        assert!(db.get_user(3).unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 2);
        assert_eq!(db.list_users().unwrap()[1].name, "bob");
    }

    #[test]
    fn test_in_memory_survives_connection_checkouts() {
        let db = Database::in_memory().unwrap();
        db.insert_user(&User::new(1, "alice")).unwrap();
        for _ in 0..5 {
            let _conn = db.get_connection().unwrap();
        }
        assert_eq!(db.count_users().unwrap(), 1);
        assert_eq!(db.get_user(1).unwrap().map(|u| u.name).as_deref(), Some("alice"));
    }

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("bridge.db");
        assert!(matches!(Database::open(&path), Err(DatabaseError::NotFound(_))));

        Database::new(&path).unwrap().insert_user(&User::new(1, "alice")).unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.count_users().unwrap(), 1);
    }
}
