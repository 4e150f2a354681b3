use crate::error::EngineResult;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, JsonValue> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_year(req: &Request) -> Result<i64, JsonValue> {
    req.params
        .get("year")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", "missing year", None))
}

pub fn parse_bool(v: Option<&JsonValue>, default: bool) -> Result<bool, &'static str> {
    match v {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v.as_bool().ok_or("must be boolean"),
    }
}

pub fn parse_opt_string(v: Option<&JsonValue>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn parse_opt_i64(v: Option<&JsonValue>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or("must be integer or null"),
    }
}

/// Typed view of one param (or of all params when `key` is None).
pub fn parse_param<T: DeserializeOwned>(req: &Request, key: Option<&str>) -> Result<T, JsonValue> {
    let raw = match key {
        Some(k) => match req.params.get(k) {
            Some(v) => v.clone(),
            None => return Err(err(&req.id, "bad_params", format!("missing {}", k), None)),
        },
        None => req.params.clone(),
    };
    serde_json::from_value(raw).map_err(|e| {
        let what = key.unwrap_or("params");
        err(&req.id, "bad_params", format!("{}: {}", what, e), None)
    })
}

pub fn bad_param(req: &Request, key: &str, msg: &str) -> JsonValue {
    err(&req.id, "bad_params", format!("{} {}", key, msg), None)
}

/// Envelope for an engine call: `{ <key>: value }` on success.
pub fn reply<T: Serialize>(req: &Request, key: &str, res: EngineResult<T>) -> JsonValue {
    match res {
        Ok(v) => match serde_json::to_value(v) {
            Ok(v) => ok(&req.id, serde_json::json!({ key: v })),
            Err(e) => err(&req.id, "serialization_failed", e.to_string(), None),
        },
        Err(e) => engine_err(&req.id, &e),
    }
}
