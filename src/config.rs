use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "successiond.json";

/// Per-workspace tuning, read from `successiond.json` next to the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub database_file: String,
    pub sync_batch_size: usize,
    pub sync_tx_wait_ms: u64,
    pub sync_tx_timeout_ms: u64,
    pub assign_tx_wait_ms: u64,
    pub assign_tx_timeout_ms: u64,
    pub import_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_file: "successiond.sqlite3".to_string(),
            sync_batch_size: 50,
            sync_tx_wait_ms: 10_000,
            sync_tx_timeout_ms: 30_000,
            assign_tx_wait_ms: 5_000,
            assign_tx_timeout_ms: 10_000,
            import_batch_size: 200,
        }
    }
}

/// Wait (lock acquisition) and total budget for one storage transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxBudget {
    pub wait: Duration,
    pub total: Duration,
}

impl EngineConfig {
    pub fn sync_budget(&self) -> TxBudget {
        TxBudget {
            wait: Duration::from_millis(self.sync_tx_wait_ms),
            total: Duration::from_millis(self.sync_tx_timeout_ms),
        }
    }

    pub fn assign_budget(&self) -> TxBudget {
        TxBudget {
            wait: Duration::from_millis(self.assign_tx_wait_ms),
            total: Duration::from_millis(self.assign_tx_timeout_ms),
        }
    }

    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.sync_batch_size == 0 {
            self.sync_batch_size = d.sync_batch_size;
        }
        if self.import_batch_size == 0 {
            self.import_batch_size = d.import_batch_size;
        }
        if self.database_file.trim().is_empty() {
            self.database_file = d.database_file;
        }
        self
    }
}

/// Reads the workspace config file if present. A missing file yields the
/// defaults; a malformed one is an error for the caller to log.
pub fn load(workspace: &Path) -> anyhow::Result<EngineConfig> {
    let path = workspace.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(EngineConfig::default());
    }
    let text = std::fs::read_to_string(&path)?;
    let cfg: EngineConfig = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(cfg.sanitized())
}

/// Like [`load`], but falls back to defaults so a bad file never blocks
/// opening the workspace.
pub fn load_or_default(workspace: &Path) -> EngineConfig {
    match load(workspace) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable workspace config");
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = temp_dir("successiond-cfg-missing");
        let cfg = load(&dir).expect("load");
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.sync_batch_size, 50);
        assert_eq!(cfg.assign_budget().total, Duration::from_secs(10));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = temp_dir("successiond-cfg-partial");
        std::fs::write(
            dir.join(CONFIG_FILE_NAME),
            r#"{ "syncBatchSize": 5, "importBatchSize": 0 }"#,
        )
        .expect("write cfg");
        let cfg = load(&dir).expect("load");
        assert_eq!(cfg.sync_batch_size, 5);
        assert_eq!(cfg.import_batch_size, 200);
        assert_eq!(cfg.sync_tx_timeout_ms, 30_000);
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = temp_dir("successiond-cfg-bad");
        std::fs::write(dir.join(CONFIG_FILE_NAME), "{ nope").expect("write cfg");
        assert!(load(&dir).is_err());
        assert_eq!(load_or_default(&dir), EngineConfig::default());
    }
}
