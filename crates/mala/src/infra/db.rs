//! Local durable store for settings and per-day counts using `SQLite` via
//! `SQLx`.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

/// Subdirectory under the mala home where the database file is stored.
pub const DB_DIR: &str = "db";

/// Default database filename.
pub const DB_FILE: &str = "mala.db";

/// Maximum number of pooled `SQLite` connections for the on-disk database.
///
/// A value greater than `1` allows reads from other contexts to continue
/// while a write-through from a counter transition is in flight.
pub const DB_POOL_MAX_CONNECTIONS: u32 = 5;

/// Row returned when loading a cached day from the `session_cache` table.
pub struct DayCountRow {
    pub date: String,
    pub japs: i64,
    pub taps: i64,
}

/// Thin wrapper around a `SQLite` connection pool providing query methods.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the `SQLite` database and runs embedded migrations.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the database
    /// cannot be opened, or migrations fail.
    pub async fn open(db_path: &Path) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("Failed to create database directory: {err}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(DB_POOL_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|err| format!("Failed to connect to database: {err}"))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| format!("Failed to run migrations: {err}"))?;

        Ok(Self { pool })
    }

    /// Reads one key/value setting, returning `None` when the key is absent.
    ///
    /// # Errors
    /// Returns an error if the setting lookup query fails.
    pub async fn get_setting(&self, name: &str) -> Result<Option<String>, String> {
        let row = sqlx::query(
            r"
SELECT value
FROM setting
WHERE name = ?
",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| format!("Failed to get setting: {err}"))?;

        Ok(row.map(|row| row.get("value")))
    }

    /// Inserts or replaces one key/value setting.
    ///
    /// # Errors
    /// Returns an error if the setting row cannot be written.
    pub async fn upsert_setting(&self, name: &str, value: &str) -> Result<(), String> {
        sqlx::query(
            r"
INSERT INTO setting (name, value)
VALUES (?, ?)
ON CONFLICT(name) DO UPDATE
SET value = excluded.value
",
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|err| format!("Failed to upsert setting: {err}"))?;

        Ok(())
    }

    /// Deletes one key/value setting; deleting an absent key is a no-op.
    ///
    /// # Errors
    /// Returns an error if the setting row cannot be deleted.
    pub async fn delete_setting(&self, name: &str) -> Result<(), String> {
        sqlx::query(
            r"
DELETE FROM setting
WHERE name = ?
",
        )
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|err| format!("Failed to delete setting: {err}"))?;

        Ok(())
    }

    /// Inserts or replaces the cached tap/cycle counts for one calendar day.
    ///
    /// Both counts are always written together so the stored pair never
    /// drifts apart.
    ///
    /// # Errors
    /// Returns an error if the day row cannot be written.
    pub async fn upsert_day_count(&self, date: &str, taps: i64, japs: i64) -> Result<(), String> {
        sqlx::query(
            r"
INSERT INTO session_cache (date, taps, japs)
VALUES (?, ?, ?)
ON CONFLICT(date) DO UPDATE
SET taps = excluded.taps,
    japs = excluded.japs
",
        )
        .bind(date)
        .bind(taps)
        .bind(japs)
        .execute(&self.pool)
        .await
        .map_err(|err| format!("Failed to upsert day count: {err}"))?;

        Ok(())
    }

    /// Reads the cached counts for one calendar day, when present.
    ///
    /// # Errors
    /// Returns an error if the day lookup query fails.
    pub async fn get_day_count(&self, date: &str) -> Result<Option<DayCountRow>, String> {
        let row = sqlx::query(
            r"
SELECT date,
       japs,
       taps
FROM session_cache
WHERE date = ?
",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| format!("Failed to get day count: {err}"))?;

        Ok(row.map(|row| DayCountRow {
            date: row.get("date"),
            japs: row.get("japs"),
            taps: row.get("taps"),
        }))
    }
}

#[cfg(test)]
impl Database {
    /// Opens an in-memory `SQLite` database for tests and runs migrations.
    ///
    /// # Errors
    /// Returns an error if the database connection or migrations fail.
    pub async fn open_in_memory() -> Result<Self, String> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|err| format!("Failed to connect to in-memory database: {err}"))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| format!("Failed to run migrations: {err}"))?;

        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_database_directory_and_runs_migrations() {
        // Arrange
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = temp_dir.path().join(DB_DIR).join(DB_FILE);

        // Act
        let database = Database::open(&db_path).await.expect("failed to open db");
        database
            .upsert_setting("dailyTarget", "5")
            .await
            .expect("failed to upsert setting");

        // Assert
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_get_setting_returns_none_for_missing_key() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");

        // Act
        let value = database
            .get_setting("dailyTarget")
            .await
            .expect("failed to get setting");

        // Assert
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_upsert_setting_round_trips_value() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");

        // Act
        database
            .upsert_setting("dailyTarget", "11")
            .await
            .expect("failed to upsert setting");
        let value = database
            .get_setting("dailyTarget")
            .await
            .expect("failed to get setting");

        // Assert
        assert_eq!(value, Some("11".to_string()));
    }

    #[tokio::test]
    async fn test_upsert_setting_replaces_existing_value() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");
        database
            .upsert_setting("soundVolume", "50")
            .await
            .expect("failed to upsert initial value");

        // Act
        database
            .upsert_setting("soundVolume", "80")
            .await
            .expect("failed to upsert replacement value");
        let value = database
            .get_setting("soundVolume")
            .await
            .expect("failed to get setting");

        // Assert
        assert_eq!(value, Some("80".to_string()));
    }

    #[tokio::test]
    async fn test_delete_setting_removes_key() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");
        database
            .upsert_setting("theme", "\"dark\"")
            .await
            .expect("failed to upsert setting");

        // Act
        database
            .delete_setting("theme")
            .await
            .expect("failed to delete setting");
        let value = database
            .get_setting("theme")
            .await
            .expect("failed to get setting");

        // Assert
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_upsert_day_count_replaces_row_for_same_date() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");
        database
            .upsert_day_count("2024-03-01", 107, 0)
            .await
            .expect("failed to upsert initial day count");

        // Act
        database
            .upsert_day_count("2024-03-01", 216, 2)
            .await
            .expect("failed to upsert replacement day count");
        let row = database
            .get_day_count("2024-03-01")
            .await
            .expect("failed to get day count")
            .expect("expected cached day row");

        // Assert
        assert_eq!(row.date, "2024-03-01");
        assert_eq!(row.taps, 216);
        assert_eq!(row.japs, 2);
    }

    #[tokio::test]
    async fn test_get_day_count_returns_none_for_missing_date() {
        // Arrange
        let database = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");

        // Act
        let row = database
            .get_day_count("2024-03-01")
            .await
            .expect("failed to get day count");

        // Assert
        assert!(row.is_none());
    }
}
