//! One-way copy of currently vacant personnel slots into `vacant_positions`.
//! Only active personnel rows are candidates.
//!
//! A run is an iterator of [`SyncEvent`]s so the caller can forward
//! progress as each step finishes:
//!
//! `Started -> PurgedExisting? -> Enumerated -> Batch* -> Completed | Failed`
//!
//! Each batch is its own bounded transaction. A failed batch is rolled
//! back and its records are reported as errors; later batches still run.

use crate::config::{EngineConfig, TxBudget};
use crate::db;
use crate::error::{EngineError, RecordError};
use crate::models::{PersonnelRecord, VacantPositionSnapshot};
use crate::placeholder::classify;
use crate::position_key::CompositeKey;
use crate::store::{self, PersonnelFilter};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub year: i64,
    pub unit: Option<String>,
    pub force_resync: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub synced: usize,
    pub skipped: usize,
    pub total: usize,
    pub deleted: usize,
    pub errors: Vec<RecordError>,
    /// Some records failed but the run went to the end.
    pub partial_failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum SyncEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        year: i64,
        unit: Option<String>,
        force_resync: bool,
    },
    PurgedExisting { deleted: usize },
    Enumerated { total: usize, batches: usize },
    #[serde(rename_all = "camelCase")]
    Batch {
        batch: usize,
        batches: usize,
        processed: usize,
        total: usize,
        synced: usize,
        skipped: usize,
        error_count: usize,
        failed: bool,
    },
    Completed(SyncSummary),
    Failed { message: String, summary: SyncSummary },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Purge,
    Enumerate,
    Batches,
    Finish,
    Done,
}

#[derive(Default)]
struct BatchOutcome {
    synced: usize,
    skipped: usize,
    errors: Vec<RecordError>,
}

pub struct VacancySync<'c> {
    conn: &'c Connection,
    req: SyncRequest,
    batch_size: usize,
    budget: TxBudget,
    phase: Phase,
    candidates: Vec<PersonnelRecord>,
    next_batch: usize,
    summary: SyncSummary,
}

impl<'c> VacancySync<'c> {
    pub fn new(conn: &'c Connection, cfg: &EngineConfig, req: SyncRequest) -> Self {
        Self {
            conn,
            req,
            batch_size: cfg.sync_batch_size.max(1),
            budget: cfg.sync_budget(),
            phase: Phase::Start,
            candidates: Vec::new(),
            next_batch: 0,
            summary: SyncSummary::default(),
        }
    }

    fn batches(&self) -> usize {
        self.candidates.len().div_ceil(self.batch_size)
    }

    fn fail(&mut self, e: EngineError) -> SyncEvent {
        tracing::warn!(year = self.req.year, error = %e, "vacancy sync failed");
        self.phase = Phase::Done;
        SyncEvent::Failed {
            message: e.to_string(),
            summary: self.summary.clone(),
        }
    }

    fn purge(&mut self) -> Result<usize, EngineError> {
        let year = self.req.year;
        let unit = self.req.unit.clone();
        db::with_budget(self.conn, self.budget, |tx| {
            Ok(store::delete_vacancy_rows(tx, year, unit.as_deref())?)
        })
    }

    fn enumerate(&mut self) -> Result<(), EngineError> {
        let rows = store::list_personnel(
            self.conn,
            &PersonnelFilter {
                year: self.req.year,
                unit: self.req.unit.clone(),
                active_only: true,
                ..PersonnelFilter::default()
            },
        )
        .map_err(EngineError::from_storage)?;
        self.candidates = rows
            .into_iter()
            .filter(|p| classify(p.person.full_name.as_deref(), p.person.rank.as_deref()).is_open())
            .collect();
        self.summary.total = self.candidates.len();
        Ok(())
    }

    fn run_batch(&self, chunk: &[PersonnelRecord]) -> Result<BatchOutcome, EngineError> {
        let year = self.req.year;
        db::with_budget(self.conn, self.budget, |tx| {
            // Check and insert share the batch transaction.
            let mut existing = store::vacancy_keys(tx, year)?;
            let mut out = BatchOutcome::default();
            for rec in chunk {
                let key = CompositeKey::new(
                    year,
                    rec.slot.position_number.as_deref(),
                    rec.slot.unit.as_deref(),
                    rec.slot.pos_code_id,
                );
                if !key.is_matchable() {
                    out.errors.push(RecordError::from_engine(
                        Some(rec.id.clone()),
                        None,
                        &EngineError::Validation("vacant position has no position number".into()),
                    ));
                    continue;
                }
                if existing.contains(&key) {
                    out.skipped += 1;
                    continue;
                }
                match store::insert_snapshot(tx, &snapshot_from_personnel(rec)) {
                    Ok(()) => {
                        existing.insert(key);
                        out.synced += 1;
                    }
                    Err(e) => out.errors.push(RecordError::from_engine(
                        Some(rec.id.clone()),
                        rec.slot.position_number.clone(),
                        &EngineError::from_storage(e),
                    )),
                }
            }
            Ok(out)
        })
    }

    fn step_batch(&mut self) -> SyncEvent {
        let batches = self.batches();
        let start = self.next_batch * self.batch_size;
        let end = (start + self.batch_size).min(self.candidates.len());
        let chunk = self.candidates[start..end].to_vec();
        self.next_batch += 1;

        let failed = match self.run_batch(&chunk) {
            Ok(out) => {
                self.summary.synced += out.synced;
                self.summary.skipped += out.skipped;
                self.summary.errors.extend(out.errors);
                false
            }
            Err(e) => {
                tracing::warn!(batch = self.next_batch, error = %e, "vacancy sync batch rolled back");
                self.summary.errors.extend(chunk.iter().map(|rec| {
                    RecordError::from_engine(
                        Some(rec.id.clone()),
                        rec.slot.position_number.clone(),
                        &e,
                    )
                }));
                true
            }
        };
        if self.next_batch >= batches {
            self.phase = Phase::Finish;
        }

        SyncEvent::Batch {
            batch: self.next_batch,
            batches,
            processed: end,
            total: self.summary.total,
            synced: self.summary.synced,
            skipped: self.summary.skipped,
            error_count: self.summary.errors.len(),
            failed,
        }
    }
}

impl Iterator for VacancySync<'_> {
    type Item = SyncEvent;

    fn next(&mut self) -> Option<SyncEvent> {
        match self.phase {
            Phase::Start => {
                tracing::info!(
                    year = self.req.year,
                    unit = ?self.req.unit,
                    force = self.req.force_resync,
                    "vacancy sync started"
                );
                self.phase = if self.req.force_resync {
                    Phase::Purge
                } else {
                    Phase::Enumerate
                };
                Some(SyncEvent::Started {
                    year: self.req.year,
                    unit: self.req.unit.clone(),
                    force_resync: self.req.force_resync,
                })
            }
            Phase::Purge => match self.purge() {
                Ok(deleted) => {
                    self.summary.deleted = deleted;
                    self.phase = Phase::Enumerate;
                    Some(SyncEvent::PurgedExisting { deleted })
                }
                Err(e) => Some(self.fail(e)),
            },
            Phase::Enumerate => match self.enumerate() {
                Ok(()) => {
                    self.phase = if self.candidates.is_empty() {
                        Phase::Finish
                    } else {
                        Phase::Batches
                    };
                    Some(SyncEvent::Enumerated {
                        total: self.summary.total,
                        batches: self.batches(),
                    })
                }
                Err(e) => Some(self.fail(e)),
            },
            Phase::Batches => Some(self.step_batch()),
            Phase::Finish => {
                self.phase = Phase::Done;
                self.summary.partial_failure = !self.summary.errors.is_empty();
                tracing::info!(
                    year = self.req.year,
                    synced = self.summary.synced,
                    skipped = self.summary.skipped,
                    errors = self.summary.errors.len(),
                    "vacancy sync completed"
                );
                Some(SyncEvent::Completed(self.summary.clone()))
            }
            Phase::Done => None,
        }
    }
}

fn snapshot_from_personnel(rec: &PersonnelRecord) -> VacantPositionSnapshot {
    let now = store::now_ts();
    VacantPositionSnapshot {
        id: uuid::Uuid::new_v4().to_string(),
        year: rec.year,
        person: rec.person.clone(),
        slot: rec.slot.clone(),
        is_assigned: false,
        display_order: 0,
        requested_position_id: None,
        nominator: None,
        assigned_at: None,
        created_at: Some(now.clone()),
        updated_at: Some(now),
    }
}
