use crate::error::EngineError;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::PosCode;
use crate::store;
use serde_json::json;

fn handle_poscodes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "posCodes": [] }));
    };
    match store::list_pos_codes(conn) {
        Ok(codes) => ok(&req.id, json!({ "posCodes": codes })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

fn handle_poscodes_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(pos_code_id) = req.params.get("posCodeId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing posCodeId", None);
    };
    let pos_code_name = match required_str(req, "posCodeName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let code = PosCode {
        pos_code_id,
        pos_code_name,
    };
    match store::upsert_pos_code(conn, &code) {
        Ok(()) => ok(&req.id, json!({ "posCode": code })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "poscodes.list" => Some(handle_poscodes_list(state, req)),
        "poscodes.upsert" => Some(handle_poscodes_upsert(state, req)),
        _ => None,
    }
}
