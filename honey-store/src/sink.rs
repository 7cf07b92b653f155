//! Credential Sink
//!
//! Append-only recording of what attackers submit to the decoy.
//!
//! The sink never decides anything about the HTTP response. Callers get a
//! `StoreResult` so they can log failures, and the decoy answers the same
//! way whether or not the write landed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{CredentialAttempt, ExploitAttempt};

/// Stored in place of an absent or empty username
pub const BLANK_USERNAME: &str = "[BLANK USERNAME]";

/// Stored in place of an absent or empty password
pub const BLANK_PASSWORD: &str = "[BLANK PASSWORD]";

const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "credential";

// ============================================================================
// BODY PARSING
// ============================================================================

/// Credentials pulled out of a login check body, still in the raw
/// submitted encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSubmission {
    pub username: String,
    pub password: String,
}

impl LoginSubmission {
    /// Build a submission, substituting the placeholders for empty values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        Self {
            username: if username.is_empty() { BLANK_USERNAME.to_string() } else { username },
            password: if password.is_empty() { BLANK_PASSWORD.to_string() } else { password },
        }
    }
}

/// Parse an `&`-joined `key=value` body such as
/// `ajax=1&username=test&realm=&credential=test`.
///
/// Fragments without `=` are dropped. When a key repeats, the last value
/// wins. Values are not decoded.
pub fn parse_login_body(body: &str) -> LoginSubmission {
    let mut username = "";
    let mut password = "";

    for (key, value) in body.split('&').filter_map(|pair| pair.split_once('=')) {
        match key {
            USERNAME_FIELD => username = value,
            PASSWORD_FIELD => password = value,
            _ => {}
        }
    }

    LoginSubmission::new(username, password)
}

// ============================================================================
// SINK
// ============================================================================

/// Handle to the attempt store, cheap to clone into request handlers.
#[derive(Clone)]
pub struct CredentialSink {
    pool: SqlitePool,
    mirror: Option<Arc<LogMirror>>,
}

/// Flat-file copy of the credential table, one line per attempt.
///
/// The file is opened per append so external rotation is picked up; the
/// mutex keeps concurrent appends from interleaving.
struct LogMirror {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, mirror: None }
    }

    /// Also append every credential attempt to `path` as a TSV line.
    pub fn with_log_mirror(mut self, path: impl AsRef<Path>) -> Self {
        self.mirror = Some(Arc::new(LogMirror {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }));
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Append a credential attempt to the store (and the mirror, if any).
    ///
    /// Both destinations are attempted; the first failure is returned.
    pub async fn record_credential(&self, attempt: &CredentialAttempt) -> StoreResult<()> {
        let stored = attempt.insert(&self.pool).await.map_err(StoreError::from);

        let mirrored = match &self.mirror {
            Some(mirror) => mirror.append(&attempt.to_log_line()).await,
            None => Ok(()),
        };

        stored.and(mirrored)
    }

    pub async fn record_exploit(&self, attempt: &ExploitAttempt) -> StoreResult<()> {
        attempt.insert(&self.pool).await?;
        Ok(())
    }
}

impl LogMirror {
    async fn append(&self, line: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        // one write per record keeps records whole
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
