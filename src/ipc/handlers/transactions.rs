use crate::error::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{
    bad_param, db_conn, parse_opt_string, parse_param, reply, required_str, required_year,
};
use crate::ipc::types::{AppState, Request};
use crate::models::{NewDetail, SuccessionKind, TxStatus};
use crate::store;
use crate::transactions::{self, NewTransaction};
use serde_json::json;

fn handle_transactions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = match parse_opt_string(req.params.get("status")) {
        Ok(None) => None,
        Ok(Some(s)) => match TxStatus::parse(&s) {
            Some(v) => Some(v),
            None => return bad_param(req, "status", "must be pending, completed or cancelled"),
        },
        Err(m) => return bad_param(req, "status", m),
    };
    let kind = match parse_opt_string(req.params.get("swapType")) {
        Ok(None) => None,
        Ok(Some(s)) => match SuccessionKind::parse(&s) {
            Some(v) => Some(v),
            None => return bad_param(req, "swapType", "is not a known succession kind"),
        },
        Err(m) => return bad_param(req, "swapType", m),
    };
    match store::list_transactions(conn, year, status, kind) {
        Ok(rows) => ok(&req.id, json!({ "transactions": rows })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

fn handle_transactions_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = store::get_transaction(conn, &id)
        .map_err(EngineError::from_storage)
        .and_then(|t| t.ok_or_else(|| EngineError::not_found("transaction", id.as_str())));
    reply(req, "transaction", res)
}

fn handle_transactions_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input: NewTransaction = match parse_param(req, None) {
        Ok(v) => v,
        Err(e) => return e,
    };
    reply(
        req,
        "transaction",
        transactions::create(conn, &state.config, input),
    )
}

fn handle_transactions_replace_details(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let details: Vec<NewDetail> = match parse_param(req, Some("details")) {
        Ok(v) => v,
        Err(e) => return e,
    };
    reply(
        req,
        "transaction",
        transactions::replace_details(conn, &state.config, &id, details),
    )
}

fn handle_transactions_complete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    reply(
        req,
        "transaction",
        transactions::complete(conn, &state.config, &id),
    )
}

fn handle_transactions_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reason = match parse_opt_string(req.params.get("reason")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "reason", m),
    };
    reply(
        req,
        "transaction",
        transactions::cancel(conn, &state.config, &id, reason.as_deref()),
    )
}

fn handle_transactions_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match transactions::delete(conn, &state.config, &id) {
        Ok(()) => ok(&req.id, json!({ "deleted": id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transactions.list" => Some(handle_transactions_list(state, req)),
        "transactions.get" => Some(handle_transactions_get(state, req)),
        "transactions.create" => Some(handle_transactions_create(state, req)),
        "transactions.replaceDetails" => Some(handle_transactions_replace_details(state, req)),
        "transactions.complete" => Some(handle_transactions_complete(state, req)),
        "transactions.cancel" => Some(handle_transactions_cancel(state, req)),
        "transactions.delete" => Some(handle_transactions_delete(state, req)),
        _ => None,
    }
}
