use chrono::Utc;
use core_types::Market;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Access tokens stay valid for six hours; past that we reissue.
const TOKEN_VALIDITY_SECS: i64 = 6 * 3600;

/// The persisted `{token, issued_at}` record.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    access_token: String,
    issued_at: i64,
}

/// File-backed cache for the broker's short-lived access token.
///
/// Each market writes its own file so two venues under the same account never
/// collide. The cache only remembers tokens; issuing one is the client's job.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(data_dir: &Path, market: Market) -> Self {
        Self {
            path: data_dir.join(format!("token_{}.json", market.tag())),
        }
    }

    /// Returns the cached token if it is still inside the validity window.
    pub fn load_valid(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let record: TokenRecord = serde_json::from_str(&raw).ok()?;
        let age = Utc::now().timestamp() - record.issued_at;
        if age < TOKEN_VALIDITY_SECS {
            Some(record.access_token)
        } else {
            None
        }
    }

    /// Persists a freshly issued token with the current timestamp.
    pub fn store(&self, token: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let record = TokenRecord {
            access_token: token.to_string(),
            issued_at: Utc::now().timestamp(),
        };
        std::fs::write(&self.path, serde_json::to_string(&record)?)
    }

    /// Drops the persisted token so the next cycle must re-authenticate.
    /// Used when the broker rejects a request as unauthorized.
    pub fn invalidate(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("token-cache-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn round_trips_a_fresh_token() {
        let dir = temp_dir();
        let cache = TokenCache::new(&dir, Market::Domestic);
        cache.store("abc123").unwrap();
        assert_eq!(cache.load_valid().as_deref(), Some("abc123"));
        cache.invalidate();
        assert!(cache.load_valid().is_none());
    }

    #[test]
    fn expired_token_is_not_returned() {
        let dir = temp_dir();
        let cache = TokenCache::new(&dir, Market::Overseas);
        let stale = TokenRecord {
            access_token: "old".into(),
            issued_at: Utc::now().timestamp() - TOKEN_VALIDITY_SECS - 1,
        };
        std::fs::write(&cache.path, serde_json::to_string(&stale).unwrap()).unwrap();
        assert!(cache.load_valid().is_none());
    }

    #[test]
    fn markets_use_separate_files() {
        let dir = temp_dir();
        let domestic = TokenCache::new(&dir, Market::Domestic);
        let overseas = TokenCache::new(&dir, Market::Overseas);
        domestic.store("d-token").unwrap();
        overseas.store("o-token").unwrap();
        assert_eq!(domestic.load_valid().as_deref(), Some("d-token"));
        assert_eq!(overseas.load_valid().as_deref(), Some("o-token"));
    }
}
