use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::model::ImageAsset;
use crate::{AppError, ErrorKind, BACKGROUND_CACHE_VERSION};

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    #[must_use]
    pub const fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(50).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
            });
        }

        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot look like a path".to_string(),
            });
        }

        if key.chars().any(char::is_control) {
            return Err(KvError::InvalidKey {
                key: key.escape_default().to_string(),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Cache,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Cache => "cache",
        }
    }
}

/// Key of the cached app background. The version and a digest of the prompt
/// are part of the key, so changing either one misses the old entry.
pub fn background_cache_key(prompt: &str) -> Result<KvKey, KvError> {
    let hash = blake3::hash(prompt.as_bytes());
    KvKey::new(
        KeyNamespace::Cache,
        format!("background_v{BACKGROUND_CACHE_VERSION}_{}", &hash.to_hex()[..16]),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedBackground {
    pub version: u32,
    pub image: ImageAsset,
    pub stored_at_ms: u64,
}

impl CachedBackground {
    #[must_use]
    pub const fn new(image: ImageAsset, stored_at_ms: u64) -> Self {
        Self {
            version: BACKGROUND_CACHE_VERSION,
            image,
            stored_at_ms,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, KvError> {
        encode_value(self)
    }

    /// Entries written by another cache version are treated as absent.
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>, KvError> {
        let cached: Self = decode_value(bytes)?;
        Ok((cached.version == BACKGROUND_CACHE_VERSION).then_some(cached))
    }
}

pub fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, KvError> {
    let data = serde_json::to_vec(value).map_err(|e| KvError::Serialization {
        message: e.to_string(),
    })?;
    if data.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: data.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(data)
}

pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, KvError> {
    serde_json::from_slice(bytes).map_err(|e| KvError::Serialization {
        message: e.to_string(),
    })
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl KvError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<crux_kv::error::KeyValueError> for KvError {
    fn from(e: crux_kv::error::KeyValueError) -> Self {
        Self::Storage {
            message: e.to_string(),
        }
    }
}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        let kind = match e {
            KvError::Serialization { .. } => ErrorKind::Serialization,
            KvError::InvalidKey { .. } | KvError::ValueTooLarge { .. } => ErrorKind::Validation,
            KvError::Storage { .. } => ErrorKind::Storage,
        };
        AppError::new(kind, "Local cache unavailable").with_internal(e.to_string())
    }
}
