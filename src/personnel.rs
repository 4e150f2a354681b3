//! Yearly personnel import and guarded personnel deletion.

use crate::config::EngineConfig;
use crate::db;
use crate::error::{EngineError, EngineResult, RecordError};
use crate::models::{PersonInfo, PersonnelRecord, PositionInfo};
use crate::position_key::{normalize, same_slot};
use crate::store::{self, PersonnelFilter};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    #[serde(flatten)]
    pub person: PersonInfo,
    #[serde(flatten)]
    pub slot: PositionInfo,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub total: usize,
    pub deleted: usize,
    pub errors: Vec<RecordError>,
}

/// Imports one year's roster. Rows whose normalized position number is
/// already taken (in the payload or in storage), or whose national ID
/// collides with another active holder, are reported and skipped.
pub fn import(
    conn: &Connection,
    cfg: &EngineConfig,
    year: i64,
    rows: Vec<ImportRow>,
    replace_year: bool,
) -> EngineResult<ImportSummary> {
    let mut summary = ImportSummary {
        total: rows.len(),
        ..ImportSummary::default()
    };

    if replace_year {
        summary.deleted = db::with_budget(conn, cfg.sync_budget(), |tx| {
            Ok(store::delete_personnel_year(tx, year)?)
        })?;
    }

    let existing = store::list_personnel(
        conn,
        &PersonnelFilter {
            year,
            ..PersonnelFilter::default()
        },
    )?;
    let mut taken_slots: HashSet<String> = existing
        .iter()
        .map(|p| normalize(p.slot.position_number.as_deref()))
        .filter(|k| !k.is_empty())
        .collect();
    let mut active_ids: HashSet<String> = existing
        .iter()
        .filter(|p| p.is_active)
        .filter_map(|p| p.person.national_id.as_deref().map(str::trim))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();

    let mut accepted: Vec<PersonnelRecord> = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let key = normalize(row.slot.position_number.as_deref());
        let row_ref = Some(format!("row {}", i + 1));
        if key.is_empty() {
            summary.errors.push(RecordError::from_engine(
                row_ref,
                None,
                &EngineError::Validation("position number is required".into()),
            ));
            continue;
        }
        if !taken_slots.insert(key) {
            summary.errors.push(RecordError::from_engine(
                row_ref,
                row.slot.position_number.clone(),
                &EngineError::conflict("position number already exists for this year"),
            ));
            continue;
        }
        if row.is_active {
            if let Some(nid) = row.person.national_id.as_deref().map(str::trim) {
                if !nid.is_empty() && !active_ids.insert(nid.to_string()) {
                    summary.errors.push(RecordError::from_engine(
                        row_ref,
                        row.slot.position_number.clone(),
                        &EngineError::conflict(format!(
                            "national id {} already holds an active position",
                            nid
                        )),
                    ));
                    continue;
                }
            }
        }
        let now = store::now_ts();
        accepted.push(PersonnelRecord {
            id: uuid::Uuid::new_v4().to_string(),
            year,
            person: row.person,
            slot: row.slot,
            is_active: row.is_active,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        });
    }

    for chunk in accepted.chunks(cfg.import_batch_size.max(1)) {
        let res = db::with_budget(conn, cfg.sync_budget(), |tx| {
            for rec in chunk {
                store::insert_personnel(tx, rec)?;
            }
            Ok(chunk.len())
        });
        match res {
            Ok(n) => summary.imported += n,
            Err(e) => {
                tracing::warn!(year, error = %e, "personnel import batch rolled back");
                summary.errors.extend(chunk.iter().map(|rec| {
                    RecordError::from_engine(
                        Some(rec.id.clone()),
                        rec.slot.position_number.clone(),
                        &e,
                    )
                }));
            }
        }
    }

    tracing::info!(
        year,
        imported = summary.imported,
        errors = summary.errors.len(),
        "personnel import finished"
    );
    Ok(summary)
}

/// National id that counts toward uniqueness: set, non-blank, active row.
fn active_national_id(rec: &PersonnelRecord) -> Option<&str> {
    if !rec.is_active {
        return None;
    }
    rec.person.national_id.as_deref().map(str::trim).filter(|n| !n.is_empty())
}

const FROZEN_FIELDS: [&str; 4] = ["id", "year", "createdAt", "updatedAt"];

/// Applies a camelCase field patch to one personnel row. Moving the row
/// onto a position number another row of the year already uses is a
/// conflict, as is giving an active row a national id another active row
/// of the year holds.
pub fn update(
    conn: &Connection,
    cfg: &EngineConfig,
    id: &str,
    patch: &serde_json::Map<String, serde_json::Value>,
) -> EngineResult<PersonnelRecord> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        let current = store::get_personnel(tx, id)?
            .ok_or_else(|| EngineError::not_found("personnel", id))?;
        let mut merged = serde_json::to_value(&current)?;
        for (k, v) in patch {
            if !FROZEN_FIELDS.contains(&k.as_str()) {
                merged[k.as_str()] = v.clone();
            }
        }
        let next: PersonnelRecord = serde_json::from_value(merged)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let slot_moved = !same_slot(
            current.slot.position_number.as_deref(),
            next.slot.position_number.as_deref(),
        );
        let next_nid = active_national_id(&next);
        let claims_nid = next_nid.is_some() && next_nid != active_national_id(&current);
        if slot_moved || claims_nid {
            let siblings = store::list_personnel(
                tx,
                &PersonnelFilter {
                    year: current.year,
                    ..PersonnelFilter::default()
                },
            )?;
            for other in siblings.iter().filter(|p| p.id != current.id) {
                if slot_moved
                    && same_slot(
                        other.slot.position_number.as_deref(),
                        next.slot.position_number.as_deref(),
                    )
                {
                    return Err(EngineError::conflict_with(
                        format!(
                            "position number {} is already used by {}",
                            next.slot.position_number.as_deref().unwrap_or("-"),
                            other.id
                        ),
                        json!({ "personnelId": other.id }),
                    ));
                }
                if claims_nid && active_national_id(other) == next_nid {
                    return Err(EngineError::conflict_with(
                        format!(
                            "national id {} already holds an active position",
                            next_nid.unwrap_or("-")
                        ),
                        json!({
                            "personnelId": other.id,
                            "holderName": other.person.full_name,
                            "positionNumber": other.slot.position_number,
                        }),
                    ));
                }
            }
        }

        store::update_personnel(tx, &next)?;
        store::get_personnel(tx, id)?.ok_or_else(|| EngineError::not_found("personnel", id))
    })
}

/// Deletes a personnel row unless a live succession detail points at it.
pub fn delete_guarded(conn: &Connection, cfg: &EngineConfig, id: &str) -> EngineResult<()> {
    db::with_budget(conn, cfg.assign_budget(), |tx| {
        if store::get_personnel(tx, id)?.is_none() {
            return Err(EngineError::not_found("personnel", id));
        }
        let refs = store::personnel_reference_count(tx, id)?;
        if refs > 0 {
            return Err(EngineError::conflict_with(
                format!("personnel {} is referenced by {} succession step(s)", id, refs),
                json!({ "personnelId": id, "references": refs }),
            ));
        }
        store::delete_personnel(tx, id)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{self, tests::{seed_applicant, seed_position}};

    fn row(num: &str, nid: Option<&str>) -> ImportRow {
        ImportRow {
            person: PersonInfo {
                national_id: nid.map(str::to_string),
                full_name: nid.map(|n| format!("คน {}", n)),
                rank: nid.map(|_| "ด.ต.".to_string()),
                ..PersonInfo::default()
            },
            slot: PositionInfo {
                position_number: Some(num.to_string()),
                unit: Some("X".to_string()),
                ..PositionInfo::default()
            },
            is_active: true,
        }
    }

    #[test]
    fn import_rejects_duplicate_slots_and_active_ids() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig {
            import_batch_size: 2,
            ..EngineConfig::default()
        };
        let rows = vec![
            row("01 02", Some("1")),
            row("0102", Some("2")),
            row("03", Some("1")),
            row("04", None),
            row(" ", None),
            row("05", None),
        ];
        let s = import(&conn, &cfg, 2568, rows, false).expect("import");
        assert_eq!(s.total, 6);
        assert_eq!(s.imported, 3);
        let codes: Vec<&str> = s.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["conflict", "conflict", "validation_failed"]);

        let again = import(&conn, &cfg, 2568, vec![row("0 5", None)], false).expect("import");
        assert_eq!(again.imported, 0);
        assert_eq!(again.errors.len(), 1);
    }

    #[test]
    fn replace_year_wipes_first() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        import(&conn, &cfg, 2568, vec![row("01", None), row("02", None)], false).expect("first");
        let s = import(&conn, &cfg, 2568, vec![row("01", None)], true).expect("replace");
        assert_eq!(s.deleted, 2);
        assert_eq!(s.imported, 1);
    }

    #[test]
    fn update_patches_fields_and_guards_position_number() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        seed_position(&conn, "P1", "0105 07443 0257", None);
        seed_position(&conn, "P2", "A-2", None);

        let patch = json!({ "fullName": "สมศักดิ์", "rank": "ร.ต.อ.", "id": "hijack", "year": 1 });
        let p = update(&conn, &cfg, "P1", patch.as_object().expect("object")).expect("update");
        assert_eq!(p.id, "P1");
        assert_eq!(p.year, 2568);
        assert_eq!(p.person.full_name.as_deref(), Some("สมศักดิ์"));
        assert_eq!(p.slot.unit.as_deref(), Some("X"));

        let respaced = json!({ "positionNumber": "010507443 0257" });
        update(&conn, &cfg, "P1", respaced.as_object().expect("object")).expect("same slot");

        let clash = json!({ "positionNumber": "A - 2" });
        let e = update(&conn, &cfg, "P1", clash.as_object().expect("object")).expect_err("clash");
        assert_eq!(e.code(), "conflict");

        let bad = json!({ "isActive": "yes" });
        let e = update(&conn, &cfg, "P1", bad.as_object().expect("object")).expect_err("type");
        assert_eq!(e.code(), "validation_failed");
    }

    #[test]
    fn update_keeps_active_national_ids_unique() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        import(&conn, &cfg, 2568, vec![row("01", Some("111")), row("02", Some("222"))], false)
            .expect("import");
        let rows = store::list_personnel(
            &conn,
            &PersonnelFilter {
                year: 2568,
                ..PersonnelFilter::default()
            },
        )
        .expect("list");
        let id_of = |nid: &str| {
            rows.iter()
                .find(|p| p.person.national_id.as_deref() == Some(nid))
                .map(|p| p.id.clone())
                .expect("row")
        };
        let (first, second) = (id_of("111"), id_of("222"));

        let steal = json!({ "nationalId": " 111 " });
        let e = update(&conn, &cfg, &second, steal.as_object().expect("object")).expect_err("dup");
        assert_eq!(e.code(), "conflict");
        assert_eq!(e.details().expect("details")["personnelId"], first.as_str());
        let kept = store::get_personnel(&conn, &second).expect("q").expect("row");
        assert_eq!(kept.person.national_id.as_deref(), Some("222"));

        // An inactive row may share the id; reactivating it may not.
        let retire = json!({ "nationalId": "111", "isActive": false });
        update(&conn, &cfg, &second, retire.as_object().expect("object")).expect("inactive");
        let back = json!({ "isActive": true });
        let e = update(&conn, &cfg, &second, back.as_object().expect("object")).expect_err("reactivate");
        assert_eq!(e.code(), "conflict");

        let unrelated = json!({ "notes": "ย้ายหน่วย" });
        update(&conn, &cfg, &first, unrelated.as_object().expect("object")).expect("own id");
    }

    #[test]
    fn delete_is_refused_while_referenced() {
        let conn = db::open_memory().expect("db");
        let cfg = EngineConfig::default();
        seed_position(&conn, "P1", "A-1", None);
        seed_position(&conn, "P2", "A-2", None);
        seed_applicant(&conn, "A1", "สมชาย", 4);
        assignment::assign(&conn, &cfg, "A1", "P1", None).expect("assign");

        let e = delete_guarded(&conn, &cfg, "P1").expect_err("referenced");
        assert_eq!(e.code(), "conflict");
        delete_guarded(&conn, &cfg, "P2").expect("unreferenced");
        assert_eq!(delete_guarded(&conn, &cfg, "P2").expect_err("gone").code(), "not_found");

        assignment::unassign(&conn, &cfg, "A1", None).expect("unassign");
        delete_guarded(&conn, &cfg, "P1").expect("reference cancelled");
    }
}
