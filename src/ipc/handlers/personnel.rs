use crate::error::EngineError;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{
    bad_param, db_conn, parse_bool, parse_opt_i64, parse_opt_string, parse_param, reply,
    required_str, required_year,
};
use crate::ipc::types::{AppState, Request};
use crate::personnel::{self, ImportRow};
use crate::store::{self, PersonnelFilter};
use serde_json::json;

fn handle_personnel_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let unit = match parse_opt_string(req.params.get("unit")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "unit", m),
    };
    let search = match parse_opt_string(req.params.get("search")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "search", m),
    };
    let active_only = match parse_bool(req.params.get("activeOnly"), false) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "activeOnly", m),
    };
    let limit = match parse_opt_i64(req.params.get("limit")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "limit", m),
    };
    let offset = match parse_opt_i64(req.params.get("offset")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "offset", m),
    };
    let filter = PersonnelFilter {
        year,
        unit,
        search,
        active_only,
        limit,
        offset,
    };
    match store::list_personnel(conn, &filter) {
        Ok(rows) => ok(&req.id, json!({ "personnel": rows })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

fn handle_personnel_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = store::get_personnel(conn, &id)
        .map_err(EngineError::from_storage)
        .and_then(|p| p.ok_or_else(|| EngineError::not_found("personnel", id.as_str())));
    reply(req, "personnel", res)
}

fn handle_personnel_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    reply(
        req,
        "personnel",
        personnel::update(conn, &state.config, &id, patch),
    )
}

fn handle_personnel_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match personnel::delete_guarded(conn, &state.config, &id) {
        Ok(()) => ok(&req.id, json!({ "deleted": id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

fn handle_personnel_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rows: Vec<ImportRow> = match parse_param(req, Some("rows")) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let replace_year = match parse_bool(req.params.get("replaceYear"), false) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "replaceYear", m),
    };
    match personnel::import(conn, &state.config, year, rows, replace_year) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "personnel.list" => Some(handle_personnel_list(state, req)),
        "personnel.get" => Some(handle_personnel_get(state, req)),
        "personnel.update" => Some(handle_personnel_update(state, req)),
        "personnel.delete" => Some(handle_personnel_delete(state, req)),
        "personnel.import" => Some(handle_personnel_import(state, req)),
        _ => None,
    }
}
