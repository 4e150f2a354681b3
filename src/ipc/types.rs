use std::path::PathBuf;

use crate::config::EngineConfig;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Receives progress lines (`{id, event, data}`) emitted before a
/// long-running request's final response.
pub type ProgressSink = Box<dyn FnMut(serde_json::Value)>;

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: EngineConfig,
    pub progress: Option<ProgressSink>,
}

impl AppState {
    pub fn new(progress: Option<ProgressSink>) -> Self {
        Self {
            workspace: None,
            db: None,
            config: EngineConfig::default(),
            progress,
        }
    }
}
