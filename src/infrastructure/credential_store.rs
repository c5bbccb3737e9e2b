use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Session handle for the remote routine store. Persisted as a single
/// JSON payload in the OS credential manager so the access token never
/// touches the config files on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreToken {
    pub access_token: String,
    pub user_id: String,
}

impl StoreToken {
    fn to_payload(&self) -> Result<String, InfraError> {
        serde_json::to_string(self).map_err(credential_err)
    }

    fn from_payload(payload: &str) -> Result<Self, InfraError> {
        serde_json::from_str(payload).map_err(credential_err)
    }
}

pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &StoreToken) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<StoreToken>, InfraError>;
    fn delete_token(&self) -> Result<(), InfraError>;
}

fn credential_err(error: impl std::fmt::Display) -> InfraError {
    InfraError::Credential(error.to_string())
}

/// Backed by the platform keyring (Credential Manager on Windows,
/// Keychain on macOS, Secret Service on Linux). One entry per
/// service/account pair; both halves of the pair come from store.json.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name).map_err(credential_err)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new("dawnblock-store", "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_token(&self, token: &StoreToken) -> Result<(), InfraError> {
        self.entry()?
            .set_password(&token.to_payload()?)
            .map_err(credential_err)
    }

    fn load_token(&self) -> Result<Option<StoreToken>, InfraError> {
        match self.entry()?.get_password() {
            Ok(payload) => StoreToken::from_payload(&payload).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(credential_err(error)),
        }
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            // Already signed out; deleting again is not an error.
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(credential_err(error)),
        }
    }
}

/// Test double that keeps the token in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<StoreToken>>,
}

impl InMemoryCredentialStore {
    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<StoreToken>>, InfraError> {
        self.token
            .lock()
            .map_err(|error| credential_err(format!("in-memory lock poisoned: {error}")))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_token(&self, token: &StoreToken) -> Result<(), InfraError> {
        *self.slot()? = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<StoreToken>, InfraError> {
        Ok(self.slot()?.clone())
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        *self.slot()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_round_trips_and_clears() {
        let store = InMemoryCredentialStore::default();
        assert_eq!(store.load_token().unwrap(), None);

        let token = StoreToken {
            access_token: "tok-123".to_string(),
            user_id: "user-1".to_string(),
        };
        store.save_token(&token).unwrap();
        assert_eq!(store.load_token().unwrap(), Some(token));

        store.delete_token().unwrap();
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn token_payload_round_trips() {
        let token = StoreToken {
            access_token: "tok-456".to_string(),
            user_id: "user-2".to_string(),
        };
        let payload = token.to_payload().unwrap();
        assert_eq!(StoreToken::from_payload(&payload).unwrap(), token);
    }
}
