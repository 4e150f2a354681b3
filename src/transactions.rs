//! Succession transaction lifecycle: create, replace participants,
//! complete, cancel, delete.

use crate::config::EngineConfig;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewDetail, SuccessionKind, SuccessionTransaction, TxStatus};
use crate::store;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub year: i64,
    pub swap_type: SuccessionKind,
    #[serde(default)]
    pub swap_date: Option<String>,
    #[serde(default)]
    pub status: Option<TxStatus>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub details: Vec<NewDetail>,
}

/// A step still waiting for a real participant. The promotion-chain origin
/// at sequence 0 names the starting slot and never has a holder.
fn is_open(kind: SuccessionKind, d: &NewDetail) -> bool {
    if kind == SuccessionKind::PromotionChain && d.sequence == 0 {
        return false;
    }
    d.is_placeholder
}

fn all_filled(kind: SuccessionKind, details: &[NewDetail]) -> bool {
    !details.iter().any(|d| is_open(kind, d))
}

fn load(conn: &Connection, id: &str) -> EngineResult<SuccessionTransaction> {
    store::get_transaction(conn, id)?.ok_or_else(|| EngineError::not_found("transaction", id))
}

pub fn create(
    conn: &Connection,
    cfg: &EngineConfig,
    input: NewTransaction,
) -> EngineResult<SuccessionTransaction> {
    input.swap_type.validate(&input.details)?;
    let status = input.status.unwrap_or(TxStatus::Pending);
    let filled = all_filled(input.swap_type, &input.details);
    if status == TxStatus::Completed && !filled {
        return Err(EngineError::InvalidState(
            "cannot create a completed transaction with placeholder participants".into(),
        ));
    }
    if status == TxStatus::Cancelled {
        return Err(EngineError::Validation(
            "new transactions start as pending or completed".into(),
        ));
    }

    let now = store::now_ts();
    let txn = SuccessionTransaction {
        id: uuid::Uuid::new_v4().to_string(),
        year: input.year,
        swap_date: input.swap_date,
        swap_type: input.swap_type,
        status,
        group_name: input.group_name,
        is_completed: filled,
        notes: input.notes,
        created_at: Some(now.clone()),
        updated_at: Some(now),
        details: Vec::new(),
    };
    let details = input.details;
    let id = db::with_budget(conn, cfg.assign_budget(), |tx| {
        store::insert_transaction(tx, &txn)?;
        store::insert_details(tx, &txn.id, &details)?;
        Ok(txn.id.clone())
    })?;
    tracing::info!(transaction = %id, kind = txn.swap_type.as_str(), "succession transaction created");
    load(conn, &id)
}

/// Swaps the participant list as one unit: old rows go, new rows come in.
pub fn replace_details(
    conn: &Connection,
    cfg: &EngineConfig,
    id: &str,
    details: Vec<NewDetail>,
) -> EngineResult<SuccessionTransaction> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        let current = load(tx, id)?;
        if current.status == TxStatus::Cancelled {
            return Err(EngineError::InvalidState(format!(
                "transaction {} is cancelled",
                id
            )));
        }
        current.swap_type.validate(&details)?;
        let filled = all_filled(current.swap_type, &details);
        if current.status == TxStatus::Completed && !filled {
            return Err(EngineError::InvalidState(format!(
                "transaction {} is completed; participants cannot become placeholders",
                id
            )));
        }
        store::delete_details(tx, id)?;
        store::insert_details(tx, id, &details)?;
        store::set_transaction_status(tx, id, current.status, Some(filled))?;
        Ok(())
    })?;
    load(conn, id)
}

pub fn complete(
    conn: &Connection,
    cfg: &EngineConfig,
    id: &str,
) -> EngineResult<SuccessionTransaction> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        let current = load(tx, id)?;
        if current.status == TxStatus::Cancelled {
            return Err(EngineError::InvalidState(format!(
                "transaction {} is cancelled",
                id
            )));
        }
        let open: Vec<i64> = current
            .details
            .iter()
            .filter(|d| is_open(current.swap_type, &d.step))
            .map(|d| d.step.sequence)
            .collect();
        if !open.is_empty() {
            return Err(EngineError::InvalidState(format!(
                "transaction {} still has placeholder participants at sequence {:?}",
                id, open
            )));
        }
        store::set_transaction_status(tx, id, TxStatus::Completed, Some(true))?;
        Ok(())
    })?;
    tracing::info!(transaction = %id, "succession transaction completed");
    load(conn, id)
}

pub fn cancel(
    conn: &Connection,
    cfg: &EngineConfig,
    id: &str,
    reason: Option<&str>,
) -> EngineResult<SuccessionTransaction> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        load(tx, id)?;
        store::set_transaction_status(tx, id, TxStatus::Cancelled, None)?;
        if let Some(r) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            store::append_transaction_note(tx, id, &format!("cancelled: {}", r))?;
        }
        Ok(())
    })?;
    load(conn, id)
}

pub fn delete(conn: &Connection, cfg: &EngineConfig, id: &str) -> EngineResult<()> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        load(tx, id)?;
        store::delete_details(tx, id)?;
        store::delete_transaction(tx, id)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(seq: i64, nid: &str) -> NewDetail {
        NewDetail {
            sequence: seq,
            personnel_id: Some(format!("p-{}", nid)),
            national_id: Some(nid.to_string()),
            full_name: Some(format!("คน {}", nid)),
            from_position_number: Some(format!("F{}", seq)),
            to_position_number: Some(format!("T{}", seq)),
            ..NewDetail::default()
        }
    }

    fn hole(seq: i64) -> NewDetail {
        NewDetail {
            sequence: seq,
            full_name: Some("ว่าง".to_string()),
            is_placeholder: true,
            ..NewDetail::default()
        }
    }

    fn three_way(details: Vec<NewDetail>) -> NewTransaction {
        NewTransaction {
            year: 2568,
            swap_type: SuccessionKind::ThreeWay,
            swap_date: None,
            status: None,
            group_name: Some("ชุดที่ 1".to_string()),
            notes: None,
            details,
        }
    }

    #[test]
    fn three_way_requires_three_participants() {
        let conn = db::open_memory().expect("db");
        let e = create(&conn, &EngineConfig::default(), three_way(vec![person(1, "a"), person(2, "b")]))
            .expect_err("two participants");
        assert_eq!(e.code(), "validation_failed");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM swap_transactions", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 0);
    }

    #[test]
    fn complete_blocked_until_placeholders_resolved() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        let t = create(&conn, &cfg, three_way(vec![person(1, "a"), person(2, "b"), hole(3)]))
            .expect("create");
        assert_eq!(t.status, TxStatus::Pending);
        assert!(!t.is_completed);
        assert_eq!(t.details.len(), 3);

        let e = complete(&conn, &cfg, &t.id).expect_err("placeholder left");
        assert_eq!(e.code(), "invalid_state");

        let t = replace_details(&conn, &cfg, &t.id, vec![person(1, "a"), person(2, "b"), person(3, "c")])
            .expect("replace");
        assert!(t.is_completed);
        assert_eq!(t.details[2].step.national_id.as_deref(), Some("c"));

        let t = complete(&conn, &cfg, &t.id).expect("complete");
        assert_eq!(t.status, TxStatus::Completed);
    }

    #[test]
    fn promotion_chain_origin_does_not_block_completion() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        let origin = NewDetail {
            sequence: 0,
            to_position_number: Some("T0".to_string()),
            ..NewDetail::default()
        };
        let chain = NewTransaction {
            swap_type: SuccessionKind::PromotionChain,
            ..three_way(vec![origin.clone(), person(1, "a")])
        };
        let t = create(&conn, &cfg, chain).expect("create");
        assert!(t.is_completed);
        let t = complete(&conn, &cfg, &t.id).expect("complete");
        assert_eq!(t.status, TxStatus::Completed);

        let direct = NewTransaction {
            swap_type: SuccessionKind::PromotionChain,
            status: Some(TxStatus::Completed),
            ..three_way(vec![origin, person(1, "b")])
        };
        let t = create(&conn, &cfg, direct).expect("create completed");
        assert_eq!(t.status, TxStatus::Completed);
    }

    #[test]
    fn flagged_chain_step_still_blocks_completion() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        let chain = NewTransaction {
            swap_type: SuccessionKind::PromotionChain,
            ..three_way(vec![person(1, "a"), hole(2)])
        };
        let t = create(&conn, &cfg, chain).expect("create");
        let e = complete(&conn, &cfg, &t.id).expect_err("placeholder at 2");
        assert_eq!(e.code(), "invalid_state");
        assert!(e.to_string().contains("[2]"));
    }

    #[test]
    fn replace_details_is_all_or_nothing() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        let t = create(&conn, &cfg, three_way(vec![person(1, "a"), person(2, "b"), person(3, "c")]))
            .expect("create");
        let e = replace_details(&conn, &cfg, &t.id, vec![person(1, "x")]).expect_err("wrong count");
        assert_eq!(e.code(), "validation_failed");
        let t = load(&conn, &t.id).expect("load");
        assert_eq!(t.details.len(), 3);
        assert_eq!(t.details[0].step.national_id.as_deref(), Some("a"));
    }

    #[test]
    fn cancel_keeps_row_and_delete_removes_it() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        let t = create(&conn, &cfg, three_way(vec![person(1, "a"), person(2, "b"), person(3, "c")]))
            .expect("create");
        let c = cancel(&conn, &cfg, &t.id, Some("เปลี่ยนแผน")).expect("cancel");
        assert_eq!(c.status, TxStatus::Cancelled);
        assert_eq!(c.notes.as_deref(), Some("cancelled: เปลี่ยนแผน"));
        assert_eq!(complete(&conn, &cfg, &t.id).expect_err("cancelled").code(), "invalid_state");

        delete(&conn, &cfg, &t.id).expect("delete");
        assert_eq!(load(&conn, &t.id).expect_err("gone").code(), "not_found");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM swap_transaction_details", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 0);
    }
}
