use crate::applicants::{self, NewApplicant};
use crate::error::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{
    bad_param, db_conn, parse_opt_i64, parse_param, reply, required_str, required_year,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_applicants_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Absent means both pending and assigned.
    let assigned = match req.params.get("assigned") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => match v.as_bool() {
            Some(b) => Some(b),
            None => return bad_param(req, "assigned", "must be boolean or null"),
        },
    };
    let requested = match parse_opt_i64(req.params.get("requestedPositionId")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "requestedPositionId", m),
    };
    match store::list_applicants(conn, year, assigned, requested) {
        Ok(rows) => ok(&req.id, json!({ "applicants": rows })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

fn handle_applicants_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input: NewApplicant = match parse_param(req, None) {
        Ok(v) => v,
        Err(e) => return e,
    };
    reply(req, "applicant", applicants::create(conn, &state.config, input))
}

fn handle_applicants_reorder(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ids: Vec<String> = match parse_param(req, Some("ids")) {
        Ok(v) => v,
        Err(e) => return e,
    };
    reply(
        req,
        "reordered",
        applicants::reorder(conn, &state.config, year, &ids),
    )
}

fn handle_applicants_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match applicants::delete(conn, &state.config, &id) {
        Ok(()) => ok(&req.id, json!({ "deleted": id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "applicants.list" => Some(handle_applicants_list(state, req)),
        "applicants.create" => Some(handle_applicants_create(state, req)),
        "applicants.reorder" => Some(handle_applicants_reorder(state, req)),
        "applicants.delete" => Some(handle_applicants_delete(state, req)),
        _ => None,
    }
}
