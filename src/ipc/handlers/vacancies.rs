use crate::error::{EngineError, EngineResult};
use crate::ipc::error::{engine_err, err, event, ok};
use crate::ipc::helpers::{bad_param, db_conn, parse_bool, parse_opt_string, required_year};
use crate::ipc::types::{AppState, Request};
use crate::models::TxStatus;
use crate::reconcile::{reconcile_all, PositionHolder, ReconcileReport};
use crate::store::{self, PersonnelFilter};
use crate::succession_index::SuccessionIndex;
use crate::vacancy_sync::{SyncEvent, SyncRequest, VacancySync};
use rusqlite::Connection;
use serde_json::json;

const SYNC_PROGRESS_EVENT: &str = "vacancies.sync.progress";

fn statuses(include_pending: bool) -> &'static [TxStatus] {
    if include_pending {
        &[TxStatus::Completed, TxStatus::Pending]
    } else {
        &[TxStatus::Completed]
    }
}

fn reconcile_holders<H: PositionHolder>(
    conn: &Connection,
    year: i64,
    include_pending: bool,
    holders: &[H],
) -> EngineResult<(ReconcileReport, usize)> {
    let entries = store::load_indexed_details(conn, year, statuses(include_pending))
        .map_err(EngineError::from_storage)?;
    let index = SuccessionIndex::build(entries);
    if index.is_empty() {
        tracing::debug!(year, "no succession details to reconcile against");
    }
    let names = store::pos_code_names(conn).map_err(EngineError::from_storage)?;
    Ok((reconcile_all(holders, &index, &names), index.len()))
}

fn reconcile_reply(
    req: &Request,
    res: EngineResult<(ReconcileReport, usize)>,
) -> serde_json::Value {
    match res {
        Ok((report, indexed)) => {
            let mut result = json!(report);
            result["indexedDetails"] = json!(indexed);
            ok(&req.id, result)
        }
        Err(e) => engine_err(&req.id, &e),
    }
}

struct ScopeParams {
    year: i64,
    unit: Option<String>,
    include_pending: bool,
}

fn scope_params(req: &Request) -> Result<ScopeParams, serde_json::Value> {
    let year = required_year(req)?;
    let unit = parse_opt_string(req.params.get("unit")).map_err(|m| bad_param(req, "unit", m))?;
    let include_pending = parse_bool(req.params.get("includePending"), false)
        .map_err(|m| bad_param(req, "includePending", m))?;
    Ok(ScopeParams {
        year,
        unit,
        include_pending,
    })
}

fn handle_positions_reconcile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match scope_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let filter = PersonnelFilter {
        year: scope.year,
        unit: scope.unit,
        ..PersonnelFilter::default()
    };
    let res = store::list_personnel(conn, &filter)
        .map_err(EngineError::from_storage)
        .and_then(|rows| reconcile_holders(conn, scope.year, scope.include_pending, &rows));
    reconcile_reply(req, res)
}

fn handle_vacancies_reconcile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match scope_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = store::list_vacancy_rows(conn, scope.year, scope.unit.as_deref())
        .map_err(EngineError::from_storage)
        .and_then(|rows| reconcile_holders(conn, scope.year, scope.include_pending, &rows));
    reconcile_reply(req, res)
}

fn handle_vacancies_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match scope_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::list_vacancy_rows(conn, scope.year, scope.unit.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "vacancies": rows })),
        Err(e) => engine_err(&req.id, &EngineError::from_storage(e)),
    }
}

/// Streams every non-terminal sync event as a progress line, then answers
/// with the final summary.
fn handle_vacancies_sync(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db,
        config,
        progress,
        ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let year = match required_year(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let unit = match parse_opt_string(req.params.get("unit")) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "unit", m),
    };
    let force_resync = match parse_bool(req.params.get("forceResync"), false) {
        Ok(v) => v,
        Err(m) => return bad_param(req, "forceResync", m),
    };

    let run = VacancySync::new(
        conn,
        config,
        SyncRequest {
            year,
            unit,
            force_resync,
        },
    );
    for ev in run {
        match ev {
            SyncEvent::Completed(summary) => return ok(&req.id, json!(summary)),
            SyncEvent::Failed { message, summary } => {
                return err(&req.id, "sync_failed", message, Some(json!(summary)));
            }
            other => {
                if let Some(sink) = progress.as_mut() {
                    sink(event(&req.id, SYNC_PROGRESS_EVENT, json!(other)));
                }
            }
        }
    }
    err(&req.id, "sync_failed", "sync ended without a summary", None)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "positions.reconcile" => Some(handle_positions_reconcile(state, req)),
        "vacancies.list" => Some(handle_vacancies_list(state, req)),
        "vacancies.reconcile" => Some(handle_vacancies_reconcile(state, req)),
        "vacancies.sync" => Some(handle_vacancies_sync(state, req)),
        _ => None,
    }
}
