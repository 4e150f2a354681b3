//! The applicant pool: people nominated for a requested position code.

use crate::config::EngineConfig;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::models::{PersonInfo, PositionInfo, VacantPositionSnapshot};
use crate::store;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplicant {
    pub year: i64,
    #[serde(flatten)]
    pub person: PersonInfo,
    /// Where the applicant sits today.
    #[serde(flatten)]
    pub slot: PositionInfo,
    pub requested_position_id: Option<i64>,
    #[serde(default)]
    pub nominator: Option<String>,
}

/// Adds an applicant at the end of the year's ordering.
pub fn create(
    conn: &Connection,
    cfg: &EngineConfig,
    input: NewApplicant,
) -> EngineResult<VacantPositionSnapshot> {
    let requested = input
        .requested_position_id
        .ok_or_else(|| EngineError::Validation("requestedPositionId is required".into()))?;
    let nid = input
        .person
        .national_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EngineError::Validation("nationalId is required".into()))?;

    let row = db::with_budget(conn, cfg.assign_budget(), |tx| {
        if let Some(existing) = store::find_duplicate_applicant(tx, input.year, &nid, Some(requested))? {
            return Err(EngineError::conflict_with(
                format!(
                    "{} already applied for position code {} in {}",
                    nid, requested, input.year
                ),
                json!({ "applicantId": existing }),
            ));
        }
        let now = store::now_ts();
        let mut person = input.person.clone();
        person.national_id = Some(nid.clone());
        let row = VacantPositionSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            year: input.year,
            person,
            slot: input.slot.clone(),
            is_assigned: false,
            display_order: store::next_display_order(tx, input.year)?,
            requested_position_id: Some(requested),
            nominator: input.nominator.clone(),
            assigned_at: None,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        store::insert_snapshot(tx, &row)?;
        Ok(row)
    })?;
    tracing::debug!(applicant = %row.id, order = row.display_order, "applicant added");
    Ok(row)
}

/// Rewrites display order from `ids`; every listed id must be an applicant
/// of `year`, and each may appear once.
pub fn reorder(
    conn: &Connection,
    cfg: &EngineConfig,
    year: i64,
    ids: &[String],
) -> EngineResult<usize> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(EngineError::Validation(format!("duplicate id in order: {}", id)));
        }
    }
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        for (i, id) in ids.iter().enumerate() {
            let row = store::get_snapshot(tx, id)?
                .filter(|r| r.is_applicant() && r.year == year)
                .ok_or_else(|| EngineError::not_found("applicant", id.as_str()))?;
            store::set_display_order(tx, &row.id, i as i64)?;
        }
        Ok(ids.len())
    })
}

/// Removes a pending applicant. Assigned applicants have to be unassigned
/// first so their transaction history stays consistent.
pub fn delete(conn: &Connection, cfg: &EngineConfig, id: &str) -> EngineResult<()> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        let row = store::get_snapshot(tx, id)?
            .filter(VacantPositionSnapshot::is_applicant)
            .ok_or_else(|| EngineError::not_found("applicant", id))?;
        if row.is_assigned {
            return Err(EngineError::InvalidState(format!(
                "applicant {} is assigned; unassign first",
                id
            )));
        }
        store::delete_snapshot(tx, id)?;
        Ok(())
    })
}
