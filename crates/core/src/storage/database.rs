use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};

use crate::config::AppConfig;
use crate::errors::CoreError;

use super::migrations::apply_migrations;

/// Handle to one user's portfolio database.
///
/// Holds no open connection: every operation opens its own, runs its
/// statements and closes it again when the closure returns.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    timeout: Duration,
    lock_retries: u32,
    retry_delay: Duration,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>, config: &AppConfig) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Self {
            path,
            timeout: config.db_timeout,
            lock_retries: config.lock_retries.max(1),
            retry_delay: config.lock_retry_delay,
        };

        log::info!("Opening database at {:?}", db.path);
        let conn = db.connect()?;
        if let Err(e) = apply_migrations(&conn) {
            log::error!("Failed to apply migrations to {:?}: {e}", db.path);
            return Err(e);
        }
        Ok(db)
    }

    /// Open the database belonging to `username`, as resolved by the configuration.
    pub fn open_for_user(username: &str, config: &AppConfig) -> Result<Self, CoreError> {
        Self::open(config.db_path_for(Some(username)), config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with the configured busy timeout and foreign keys enabled.
    pub fn connect(&self) -> Result<Connection, CoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.busy_timeout(self.timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Run read-only work on a short-lived connection.
    pub fn with_connection<F, R>(&self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&Connection) -> Result<R, CoreError>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// When SQLite reports the database as locked, the whole attempt is
    /// repeated (up to `lock_retries` times) before giving up with
    /// [`CoreError::DatabaseLocked`].
    pub fn transaction<F, R>(&self, mut f: F) -> Result<R, CoreError>
    where
        F: FnMut(&Transaction<'_>) -> Result<R, CoreError>,
    {
        let attempts = self.lock_retries;
        for attempt in 1..=attempts {
            match self.try_transaction(&mut f) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_lock_contention() => {
                    if attempt == attempts {
                        break;
                    }
                    log::warn!(
                        "Database is locked. Retrying in {:?}... ({attempt}/{attempts})",
                        self.retry_delay
                    );
                    std::thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
        log::error!("Could not complete write after {attempts} attempts due to database locking");
        Err(CoreError::DatabaseLocked { attempts })
    }

    fn try_transaction<F, R>(&self, f: &mut F) -> Result<R, CoreError>
    where
        F: FnMut(&Transaction<'_>) -> Result<R, CoreError>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}
