use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{db_conn, required_year};
use crate::ipc::types::{AppState, Request};
use crate::stats;
use serde_json::json;

fn handle_stats_succession(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match stats::stats(conn, year) {
        Ok(s) => ok(&req.id, json!(s)),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.succession" => Some(handle_stats_succession(state, req)),
        _ => None,
    }
}
