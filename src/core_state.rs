//! Shared application state for the REST layer.
//!
//! `CoreState` is built once at startup and passed explicitly (wrapped in
//! `Arc`) to every component that needs storage, the clock, or the admin
//! credential. There is no process-global client or session.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use subtle::ConstantTimeEq;

use crate::alerting::{Caller, Clock, SystemClock};
use crate::api::types::hash_token;
use crate::db;

pub struct CoreState {
    /// Single connection; a request holds it for its whole
    /// read-modify-reconcile sequence.
    db: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    admin_token_hash: [u8; 32],
}

impl CoreState {
    pub fn new(conn: Connection, clock: Arc<dyn Clock>, admin_token: &str) -> Self {
        Self {
            db: Mutex::new(conn),
            clock,
            admin_token_hash: hash_token(admin_token),
        }
    }

    /// State over an in-memory database with the system clock.
    pub fn in_memory(admin_token: &str) -> Result<Self, CoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self::new(conn, Arc::new(SystemClock), admin_token))
    }

    /// Acquire the database connection.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Classify a bearer token. Comparison is constant-time on the hash.
    pub fn identify(&self, token: &str) -> Caller {
        let presented = hash_token(token);
        if bool::from(presented[..].ct_eq(&self.admin_token_hash[..])) {
            Caller::Admin
        } else {
            Caller::Client
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
