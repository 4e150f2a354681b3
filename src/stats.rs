use crate::error::{EngineError, EngineResult};
use crate::models::{SuccessionDetail, SuccessionKind, TxStatus, VacantPositionSnapshot};
use crate::placeholder::{classify, Occupancy};
use crate::position_key::CompositeKey;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacantPositionStats {
    /// Distinct vacancy slots (after composite-key dedupe).
    pub total: usize,
    /// Plain vacancies still open.
    pub vacant: usize,
    pub vacant_assigned: usize,
    /// Reserved vacancies still open.
    pub reserved: usize,
    pub reserved_assigned: usize,
    /// Snapshot rows dropped because their key was already counted.
    pub duplicate_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosCodeCount {
    pub pos_code_id: Option<i64>,
    pub pos_code_name: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantStats {
    pub total: usize,
    pub pending: usize,
    pub assigned: usize,
    pub pending_by_pos_code: Vec<PosCodeCount>,
    pub assigned_by_pos_code: Vec<PosCodeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessionStats {
    pub year: i64,
    pub vacant_positions: VacantPositionStats,
    pub applicants: ApplicantStats,
}

fn count_by_pos_code<'a>(
    rows: impl Iterator<Item = &'a VacantPositionSnapshot>,
    names: &HashMap<i64, String>,
) -> Vec<PosCodeCount> {
    let mut counts: BTreeMap<Option<i64>, usize> = BTreeMap::new();
    for r in rows {
        *counts.entry(r.requested_position_id).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(id, count)| PosCodeCount {
            pos_code_id: id,
            pos_code_name: id.and_then(|i| names.get(&i).cloned()),
            count,
        })
        .collect()
}

/// Counts open vs. assigned vacancies and pending vs. assigned applicants.
///
/// Vacancy rows are matched to completed assignment details by composite
/// position key; the detail only stores copied position text.
pub fn compute(
    year: i64,
    vacancy_rows: &[VacantPositionSnapshot],
    applicants: &[VacantPositionSnapshot],
    assignment_details: &[SuccessionDetail],
    pos_code_names: &HashMap<i64, String>,
) -> SuccessionStats {
    let assigned_keys: HashSet<CompositeKey> = assignment_details
        .iter()
        .map(|d| {
            CompositeKey::new(
                year,
                d.step.to_position_number.as_deref(),
                d.step.to_unit.as_deref(),
                d.step.to_pos_code_id,
            )
        })
        .filter(CompositeKey::is_matchable)
        .collect();

    let mut vp = VacantPositionStats::default();
    let mut seen: HashSet<CompositeKey> = HashSet::new();
    for row in vacancy_rows {
        let key = CompositeKey::new(
            year,
            row.slot.position_number.as_deref(),
            row.slot.unit.as_deref(),
            row.slot.pos_code_id,
        );
        if !seen.insert(key.clone()) {
            vp.duplicate_rows += 1;
            continue;
        }
        vp.total += 1;
        let assigned = assigned_keys.contains(&key);
        match (classify(row.person.full_name.as_deref(), row.person.rank.as_deref()), assigned) {
            (Occupancy::Reserved, true) => vp.reserved_assigned += 1,
            (Occupancy::Reserved, false) => vp.reserved += 1,
            (_, true) => vp.vacant_assigned += 1,
            (_, false) => vp.vacant += 1,
        }
    }

    let pending = applicants.iter().filter(|a| !a.is_assigned);
    let assigned = applicants.iter().filter(|a| a.is_assigned);
    let ap = ApplicantStats {
        total: applicants.len(),
        pending: applicants.iter().filter(|a| !a.is_assigned).count(),
        assigned: applicants.iter().filter(|a| a.is_assigned).count(),
        pending_by_pos_code: count_by_pos_code(pending, pos_code_names),
        assigned_by_pos_code: count_by_pos_code(assigned, pos_code_names),
    };

    SuccessionStats {
        year,
        vacant_positions: vp,
        applicants: ap,
    }
}

pub fn stats(conn: &Connection, year: i64) -> EngineResult<SuccessionStats> {
    let vacancy_rows = store::list_vacancy_rows(conn, year, None).map_err(EngineError::from_storage)?;
    let applicants =
        store::list_applicants(conn, year, None, None).map_err(EngineError::from_storage)?;
    let details: Vec<SuccessionDetail> =
        store::load_indexed_details(conn, year, &[TxStatus::Completed])
            .map_err(EngineError::from_storage)?
            .into_iter()
            .filter(|e| e.kind == SuccessionKind::VacantAssignment && e.year == year)
            .map(|e| e.detail)
            .collect();
    let names = store::pos_code_names(conn).map_err(EngineError::from_storage)?;
    Ok(compute(year, &vacancy_rows, &applicants, &details, &names))
}
