/// Alert persistence layer
///
/// Keeps one newest-first log per user, capped at `MAX_ALERTS_PER_USER`
/// entries, with read/unread tracking. The file-backed implementation does a
/// full load/mutate/save cycle per operation; a per-user async mutex
/// serializes those cycles so concurrent mutations of the same log cannot
/// lose updates. Operations on a user with no history behave as an empty log.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Alert, AlertType};

/// Oldest entries are evicted once a user's log exceeds this.
pub const MAX_ALERTS_PER_USER: usize = 100;

/// Storage seam for the alert log. File-backed today; the broadcaster,
/// session protocol, and handlers only see this trait.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert at the front of the owner's log, assigning an id if absent and
    /// evicting the oldest entry past the cap. Returns the stored alert.
    async fn append(&self, alert: Alert) -> AppResult<Alert>;

    /// Newest-first listing; unread/type filters apply before the limit.
    async fn list(
        &self,
        user_id: &str,
        unread_only: bool,
        type_filter: Option<AlertType>,
        limit: usize,
    ) -> AppResult<Vec<Alert>>;

    /// Flags one alert read. Returns whether the id was found, not whether
    /// the flag changed; re-marking a read alert still reports true.
    async fn mark_read(&self, user_id: &str, alert_id: &str) -> AppResult<bool>;

    /// Flags every unread alert read, returning how many actually flipped.
    async fn mark_all_read(&self, user_id: &str) -> AppResult<usize>;

    /// Removes one alert. Returns whether it existed.
    async fn delete(&self, user_id: &str, alert_id: &str) -> AppResult<bool>;

    async fn unread_count(&self, user_id: &str) -> AppResult<usize>;
}

/// File-per-user JSON store.
pub struct FileAlertStore {
    data_dir: PathBuf,
    // user_id -> lock guarding that user's load/mutate/save cycle
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileAlertStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        // user ids come from the outside; keep them filesystem-safe
        let safe: String = user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.data_dir.join(format!("{}.json", safe))
    }

    fn load_log(&self, path: &Path) -> AppResult<Vec<Alert>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Storage(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Storage(format!("parse {}: {}", path.display(), e)))
    }

    fn save_log(&self, path: &Path, log: &[Alert]) -> AppResult<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| AppError::Storage(format!("create {}: {}", self.data_dir.display(), e)))?;
        let raw = serde_json::to_string(log)?;
        std::fs::write(path, raw)
            .map_err(|e| AppError::Storage(format!("write {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl AlertStore for FileAlertStore {
    async fn append(&self, mut alert: Alert) -> AppResult<Alert> {
        let lock = self.user_lock(&alert.user_id).await;
        let _guard = lock.lock().await;

        if alert.alert_id.is_empty() {
            alert.alert_id = Uuid::new_v4().to_string();
        }

        let path = self.user_path(&alert.user_id);
        let mut log = self.load_log(&path)?;
        log.insert(0, alert.clone());
        log.truncate(MAX_ALERTS_PER_USER);
        self.save_log(&path, &log)?;

        debug!(
            user_id = %alert.user_id,
            alert_id = %alert.alert_id,
            alert_type = alert.alert_type.as_str(),
            "appended alert"
        );
        Ok(alert)
    }

    async fn list(
        &self,
        user_id: &str,
        unread_only: bool,
        type_filter: Option<AlertType>,
        limit: usize,
    ) -> AppResult<Vec<Alert>> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let log = self.load_log(&self.user_path(user_id))?;
        Ok(log
            .into_iter()
            .filter(|a| !unread_only || !a.read)
            .filter(|a| type_filter.map_or(true, |t| a.alert_type == t))
            .take(limit)
            .collect())
    }

    async fn mark_read(&self, user_id: &str, alert_id: &str) -> AppResult<bool> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let path = self.user_path(user_id);
        let mut log = self.load_log(&path)?;

        let Some(alert) = log.iter_mut().find(|a| a.alert_id == alert_id) else {
            return Ok(false);
        };

        if !alert.read {
            alert.read = true;
            self.save_log(&path, &log)?;
        }
        Ok(true)
    }

    async fn mark_all_read(&self, user_id: &str) -> AppResult<usize> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let path = self.user_path(user_id);
        let mut log = self.load_log(&path)?;

        let mut flipped = 0;
        for alert in log.iter_mut().filter(|a| !a.read) {
            alert.read = true;
            flipped += 1;
        }
        if flipped > 0 {
            self.save_log(&path, &log)?;
        }
        Ok(flipped)
    }

    async fn delete(&self, user_id: &str, alert_id: &str) -> AppResult<bool> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let path = self.user_path(user_id);
        let mut log = self.load_log(&path)?;

        let before = log.len();
        log.retain(|a| a.alert_id != alert_id);
        if log.len() == before {
            return Ok(false);
        }
        self.save_log(&path, &log)?;
        Ok(true)
    }

    async fn unread_count(&self, user_id: &str) -> AppResult<usize> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let log = self.load_log(&self.user_path(user_id))?;
        Ok(log.iter().filter(|a| !a.read).count())
    }
}
