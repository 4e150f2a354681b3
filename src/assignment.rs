//! Moving an applicant into a vacant position, and backing that out.

use crate::config::EngineConfig;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    NewDetail, SuccessionKind, SuccessionTransaction, TxStatus, VacantPositionSnapshot,
};
use crate::placeholder::is_placeholder_name;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub transaction_id: String,
    pub applicant_id: String,
    pub personnel_id: String,
    pub position_number: Option<String>,
    pub assigned_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignOutcome {
    pub applicant_id: String,
    pub cancelled: usize,
    pub transaction_ids: Vec<String>,
}

/// Puts an applicant into a vacant personnel slot.
///
/// Copies the applicant's person fields over the target row, records a
/// completed `vacant-assignment` transaction and takes the applicant out
/// of the pending pool (`is_assigned = true`). All of it commits together
/// or not at all.
pub fn assign(
    conn: &Connection,
    cfg: &EngineConfig,
    applicant_id: &str,
    personnel_id: &str,
    notes: Option<&str>,
) -> EngineResult<AssignOutcome> {
    let outcome = db::with_budget(conn, cfg.assign_budget(), |tx| {
        let applicant = store::get_snapshot(tx, applicant_id)?
            .filter(VacantPositionSnapshot::is_applicant)
            .ok_or_else(|| EngineError::not_found("applicant", applicant_id))?;
        if applicant.is_assigned {
            return Err(EngineError::InvalidState(format!(
                "applicant {} is already assigned",
                applicant_id
            )));
        }
        let target = store::get_personnel(tx, personnel_id)?
            .ok_or_else(|| EngineError::not_found("personnel", personnel_id))?;
        if target.year != applicant.year {
            return Err(EngineError::Validation(format!(
                "applicant {} belongs to {}, position {} to {}",
                applicant.id, applicant.year, target.id, target.year
            )));
        }

        if !is_placeholder_name(target.person.full_name.as_deref()) {
            let holder = target.person.full_name.clone().unwrap_or_default();
            return Err(EngineError::conflict_with(
                format!(
                    "position {} is already held by {}",
                    target.slot.position_number.as_deref().unwrap_or("-"),
                    holder.trim()
                ),
                json!({
                    "personnelId": target.id,
                    "holderName": holder.trim(),
                    "holderNationalId": target.person.national_id,
                    "positionNumber": target.slot.position_number,
                }),
            ));
        }

        store::overwrite_person(tx, &target.id, &applicant.person)?;

        let step = NewDetail {
            sequence: 1,
            personnel_id: Some(target.id.clone()),
            applicant_id: Some(applicant.id.clone()),
            national_id: applicant.person.national_id.clone(),
            full_name: applicant.person.full_name.clone(),
            rank: applicant.person.rank.clone(),
            from_pos_code_id: applicant.slot.pos_code_id,
            from_position: applicant.slot.position.clone(),
            from_position_number: applicant.slot.position_number.clone(),
            from_unit: applicant.slot.unit.clone(),
            to_pos_code_id: target.slot.pos_code_id,
            to_position: target.slot.position.clone(),
            to_position_number: target.slot.position_number.clone(),
            to_unit: target.slot.unit.clone(),
            is_placeholder: false,
            notes: None,
        };
        let steps = [step];
        SuccessionKind::VacantAssignment.validate(&steps)?;

        let now = store::now_ts();
        let txn = SuccessionTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            year: target.year,
            swap_date: Some(chrono::Utc::now().date_naive().to_string()),
            swap_type: SuccessionKind::VacantAssignment,
            status: TxStatus::Completed,
            group_name: None,
            is_completed: true,
            notes: notes.map(str::to_string),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            details: Vec::new(),
        };
        store::insert_transaction(tx, &txn)?;
        store::insert_details(tx, &txn.id, &steps)?;
        store::set_applicant_assigned(tx, &applicant.id, true)?;

        Ok(AssignOutcome {
            transaction_id: txn.id,
            applicant_id: applicant.id,
            personnel_id: target.id,
            position_number: target.slot.position_number,
            assigned_name: applicant.person.full_name,
        })
    })?;

    tracing::info!(
        applicant = %outcome.applicant_id,
        personnel = %outcome.personnel_id,
        transaction = %outcome.transaction_id,
        "applicant assigned"
    );
    Ok(outcome)
}

/// Returns an assigned applicant to the pending pool and cancels the
/// assignment transactions that reference it.
///
/// The personnel row keeps the applicant's data; reverting it is left to
/// an explicit personnel edit.
pub fn unassign(
    conn: &Connection,
    cfg: &EngineConfig,
    applicant_id: &str,
    reason: Option<&str>,
) -> EngineResult<UnassignOutcome> {
    let outcome = db::with_budget(conn, cfg.assign_budget(), |tx| {
        let applicant = store::get_snapshot(tx, applicant_id)?
            .filter(VacantPositionSnapshot::is_applicant)
            .ok_or_else(|| EngineError::not_found("applicant", applicant_id))?;
        if !applicant.is_assigned {
            return Err(EngineError::InvalidState(format!(
                "applicant {} is not assigned",
                applicant_id
            )));
        }
        store::set_applicant_assigned(tx, applicant_id, false)?;

        let ids = store::live_assignment_transactions_for(tx, applicant_id)?;
        for id in &ids {
            store::set_transaction_status(tx, id, TxStatus::Cancelled, None)?;
            if let Some(r) = reason.map(str::trim).filter(|r| !r.is_empty()) {
                store::append_transaction_note(tx, id, &format!("unassigned: {}", r))?;
            }
        }
        Ok(UnassignOutcome {
            applicant_id: applicant_id.to_string(),
            cancelled: ids.len(),
            transaction_ids: ids,
        })
    })?;

    tracing::info!(
        applicant = %outcome.applicant_id,
        cancelled = outcome.cancelled,
        "applicant unassigned"
    );
    Ok(outcome)
}
