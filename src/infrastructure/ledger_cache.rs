use crate::domain::models::{
    Block, ChallengeCycle, DailyCompletion, DailySummary, Profile, RestartEvent,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardLedger {
    pub profile: Profile,
    pub blocks: Vec<Block>,
    pub cycle: ChallengeCycle,
    pub summaries: Vec<DailySummary>,
    pub completions: Vec<DailyCompletion>,
    pub restart_events: Vec<RestartEvent>,
    pub cached_at: DateTime<Utc>,
}

pub trait LedgerCacheRepository: Send + Sync {
    fn load(&self, user_id: &str) -> Result<Option<DashboardLedger>, InfraError>;
    fn save(&self, user_id: &str, ledger: &DashboardLedger) -> Result<(), InfraError>;
    fn clear(&self, user_id: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteLedgerCacheRepository {
    db_path: PathBuf,
}

impl SqliteLedgerCacheRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn normalized_user_id(user_id: &str) -> Option<String> {
        let normalized = user_id.trim();
        if normalized.is_empty() {
            return None;
        }
        Some(normalized.to_string())
    }
}

impl LedgerCacheRepository for SqliteLedgerCacheRepository {
    fn load(&self, user_id: &str) -> Result<Option<DashboardLedger>, InfraError> {
        let Some(user_id) = Self::normalized_user_id(user_id) else {
            return Ok(None);
        };

        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM dashboard_ledger WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let ledger = serde_json::from_str(&payload).map_err(|error| {
            InfraError::InvalidRecord(format!("invalid cached dashboard payload: {error}"))
        })?;
        Ok(Some(ledger))
    }

    fn save(&self, user_id: &str, ledger: &DashboardLedger) -> Result<(), InfraError> {
        let user_id = Self::normalized_user_id(user_id).ok_or_else(|| {
            InfraError::InvalidRecord("user id is required for ledger cache save".to_string())
        })?;

        let payload = serde_json::to_string(ledger)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO dashboard_ledger (user_id, payload, cached_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               payload = excluded.payload,
               cached_at = excluded.cached_at",
            params![user_id, payload, ledger.cached_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<(), InfraError> {
        let Some(user_id) = Self::normalized_user_id(user_id) else {
            return Ok(());
        };

        let connection = self.connect()?;
        connection.execute(
            "DELETE FROM dashboard_ledger WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerCacheRepository {
    ledgers: Mutex<HashMap<String, DashboardLedger>>,
}

impl LedgerCacheRepository for InMemoryLedgerCacheRepository {
    fn load(&self, user_id: &str) -> Result<Option<DashboardLedger>, InfraError> {
        let Some(user_id) = SqliteLedgerCacheRepository::normalized_user_id(user_id) else {
            return Ok(None);
        };
        let ledgers = self.ledgers.lock().map_err(|error| {
            InfraError::InconsistentState(format!("ledger cache lock poisoned: {error}"))
        })?;
        Ok(ledgers.get(&user_id).cloned())
    }

    fn save(&self, user_id: &str, ledger: &DashboardLedger) -> Result<(), InfraError> {
        let user_id = SqliteLedgerCacheRepository::normalized_user_id(user_id).ok_or_else(|| {
            InfraError::InvalidRecord("user id is required for ledger cache save".to_string())
        })?;
        let mut ledgers = self.ledgers.lock().map_err(|error| {
            InfraError::InconsistentState(format!("ledger cache lock poisoned: {error}"))
        })?;
        ledgers.insert(user_id, ledger.clone());
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<(), InfraError> {
        let Some(user_id) = SqliteLedgerCacheRepository::normalized_user_id(user_id) else {
            return Ok(());
        };
        let mut ledgers = self.ledgers.lock().map_err(|error| {
            InfraError::InconsistentState(format!("ledger cache lock poisoned: {error}"))
        })?;
        ledgers.remove(&user_id);
        Ok(())
    }
}
