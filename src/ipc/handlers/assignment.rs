use crate::assignment;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{bad_param, db_conn, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let applicant_id = match required_str(req, "applicantId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let personnel_id = match required_str(req, "personnelId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let notes = match parse_opt_string(req.params.get("notes")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "notes", m),
    };
    match assignment::assign(
        conn,
        &state.config,
        &applicant_id,
        &personnel_id,
        notes.as_deref(),
    ) {
        Ok(out) => ok(&req.id, json!(out)),
        Err(e) => engine_err(&req.id, &e),
    }
}

fn handle_unassign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let applicant_id = match required_str(req, "applicantId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reason = match parse_opt_string(req.params.get("reason")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "reason", m),
    };
    match assignment::unassign(conn, &state.config, &applicant_id, reason.as_deref()) {
        Ok(out) => ok(&req.id, json!(out)),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignment.assign" => Some(handle_assign(state, req)),
        "assignment.unassign" => Some(handle_unassign(state, req)),
        _ => None,
    }
}
