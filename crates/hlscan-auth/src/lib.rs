use std::collections::HashMap;
use std::sync::Mutex;

use hlscan_core::config::Properties;
use hlscan_core::error::HlError;

/// Which service a stored token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    GitHub,
    Highlight,
}

impl TokenKind {
    pub const ALL: [TokenKind; 2] = [TokenKind::GitHub, TokenKind::Highlight];

    /// Keychain entry name.
    pub fn credential_key(&self) -> &'static str {
        match self {
            TokenKind::GitHub => "hlscan:github",
            TokenKind::Highlight => "hlscan:highlight",
        }
    }

    /// Properties key the token stands in for.
    pub fn property_key(&self) -> &'static str {
        match self {
            TokenKind::GitHub => "GITHUB_TOKEN",
            TokenKind::Highlight => "TOKEN",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::GitHub => write!(f, "github"),
            TokenKind::Highlight => write!(f, "highlight"),
        }
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" | "gh" => Ok(TokenKind::GitHub),
            "highlight" | "hl" => Ok(TokenKind::Highlight),
            _ => Err(format!("unknown token kind: {s}")),
        }
    }
}

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store a token under the given key.
    fn store(&self, key: &str, token: &str) -> Result<(), HlError>;

    /// Retrieve a token by key.
    fn get(&self, key: &str) -> Result<Option<String>, HlError>;

    /// Delete a stored token.
    fn delete(&self, key: &str) -> Result<(), HlError>;
}

/// Fill blank token properties from the store. Tokens written in the
/// properties file always win.
pub fn fill_tokens(props: &mut Properties, store: &dyn CredentialStore) -> Result<(), HlError> {
    for kind in TokenKind::ALL {
        if !props.is_blank(kind.property_key()) {
            continue;
        }
        if let Some(token) = store.get(kind.credential_key())? {
            tracing::debug!("using stored {kind} token");
            props.set(kind.property_key(), token);
        }
    }
    Ok(())
}

/// OS keychain-backed credential store using the `keyring` crate.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "hlscan".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, HlError> {
        keyring::Entry::new(&self.service, key).map_err(|e| HlError::CredentialError {
            message: e.to_string(),
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, token: &str) -> Result<(), HlError> {
        self.entry(key)?
            .set_password(token)
            .map_err(|e| HlError::CredentialError {
                message: e.to_string(),
            })
    }

    fn get(&self, key: &str) -> Result<Option<String>, HlError> {
        match self.entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(HlError::CredentialError {
                message: e.to_string(),
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), HlError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(HlError::CredentialError {
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory credential store for testing.
#[derive(Default)]
pub struct MemoryStore {
    store: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, HlError> {
        self.store.lock().map_err(|_| HlError::CredentialError {
            message: "credential store poisoned".into(),
        })
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, token: &str) -> Result<(), HlError> {
        self.lock()?.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, HlError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), HlError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("test-key").unwrap(), None);
        store.store("test-key", "secret-token").unwrap();
        assert_eq!(store.get("test-key").unwrap(), Some("secret-token".to_string()));
        store.delete("test-key").unwrap();
        assert_eq!(store.get("test-key").unwrap(), None);
    }

    #[test]
    fn test_fill_tokens_prefers_properties() {
        let store = MemoryStore::new();
        store.store(TokenKind::GitHub.credential_key(), "from-keychain").unwrap();
        store.store(TokenKind::Highlight.credential_key(), "hl-keychain").unwrap();

        let mut props = Properties::parse("GITHUB_TOKEN=\nTOKEN=hl-file\n").unwrap();
        fill_tokens(&mut props, &store).unwrap();
        assert_eq!(props.get("GITHUB_TOKEN"), Some("from-keychain"));
        assert_eq!(props.get("TOKEN"), Some("hl-file"));
    }

    #[test]
    fn test_token_kind_parse() {
        assert_eq!("GitHub".parse::<TokenKind>().unwrap(), TokenKind::GitHub);
        assert_eq!("hl".parse::<TokenKind>().unwrap(), TokenKind::Highlight);
        assert!("gitlab".parse::<TokenKind>().is_err());
    }
}
