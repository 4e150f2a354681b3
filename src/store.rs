//! Row mapping and parametrized queries over the five record tables.
//!
//! Every function takes the connection (or a transaction, via deref) from
//! the caller; nothing here holds state.

use crate::models::{
    NewDetail, PersonInfo, PersonnelRecord, PosCode, PositionInfo, SuccessionDetail,
    SuccessionKind, SuccessionTransaction, TxStatus, VacantPositionSnapshot,
};
use crate::position_key::CompositeKey;
use crate::succession_index::IndexedDetail;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};

const PERSON_COLS: &str = "national_id, full_name, rank, seniority, age, birth_date,
    appointment_date, rank_since, enrollment_date, retirement_date, years_of_service,
    training_location, training_course, supporter_name, support_reason, notes";
const PERSON_COL_COUNT: usize = 16;
const SLOT_COLS: &str = "pos_code_id, position, position_number, unit, acting_as";
const DETAIL_COLS: &str = "d.id, d.transaction_id, d.sequence, d.personnel_id, d.applicant_id,
    d.national_id, d.full_name, d.rank, d.from_pos_code_id, d.from_position,
    d.from_position_number, d.from_unit, d.to_pos_code_id, d.to_position,
    d.to_position_number, d.to_unit, d.is_placeholder, d.notes";

pub fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn int(v: Option<i64>) -> Value {
    match v {
        Some(i) => Value::Integer(i),
        None => Value::Null,
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn person_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<PersonInfo> {
    Ok(PersonInfo {
        national_id: row.get(at)?,
        full_name: row.get(at + 1)?,
        rank: row.get(at + 2)?,
        seniority: row.get(at + 3)?,
        age: row.get(at + 4)?,
        birth_date: row.get(at + 5)?,
        appointment_date: row.get(at + 6)?,
        rank_since: row.get(at + 7)?,
        enrollment_date: row.get(at + 8)?,
        retirement_date: row.get(at + 9)?,
        years_of_service: row.get(at + 10)?,
        training_location: row.get(at + 11)?,
        training_course: row.get(at + 12)?,
        supporter_name: row.get(at + 13)?,
        support_reason: row.get(at + 14)?,
        notes: row.get(at + 15)?,
    })
}

fn person_values(p: &PersonInfo) -> Vec<Value> {
    vec![
        text(&p.national_id),
        text(&p.full_name),
        text(&p.rank),
        text(&p.seniority),
        text(&p.age),
        text(&p.birth_date),
        text(&p.appointment_date),
        text(&p.rank_since),
        text(&p.enrollment_date),
        text(&p.retirement_date),
        text(&p.years_of_service),
        text(&p.training_location),
        text(&p.training_course),
        text(&p.supporter_name),
        text(&p.support_reason),
        text(&p.notes),
    ]
}

fn slot_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<PositionInfo> {
    Ok(PositionInfo {
        pos_code_id: row.get(at)?,
        position: row.get(at + 1)?,
        position_number: row.get(at + 2)?,
        unit: row.get(at + 3)?,
        acting_as: row.get(at + 4)?,
    })
}

fn slot_values(s: &PositionInfo) -> Vec<Value> {
    vec![
        int(s.pos_code_id),
        text(&s.position),
        text(&s.position_number),
        text(&s.unit),
        text(&s.acting_as),
    ]
}

fn assignments(cols: &str) -> String {
    cols.split(',')
        .map(|c| format!("{} = ?", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---- personnel -------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PersonnelFilter {
    pub year: i64,
    pub unit: Option<String>,
    pub search: Option<String>,
    pub active_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn personnel_select() -> String {
    format!(
        "SELECT id, year, {}, {}, is_active, created_at, updated_at FROM personnel",
        PERSON_COLS, SLOT_COLS
    )
}

fn personnel_from_row(row: &Row<'_>) -> rusqlite::Result<PersonnelRecord> {
    let active: i64 = row.get(23)?;
    Ok(PersonnelRecord {
        id: row.get(0)?,
        year: row.get(1)?,
        person: person_from_row(row, 2)?,
        slot: slot_from_row(row, 2 + PERSON_COL_COUNT)?,
        is_active: active != 0,
        created_at: row.get(24)?,
        updated_at: row.get(25)?,
    })
}

pub fn list_personnel(
    conn: &Connection,
    filter: &PersonnelFilter,
) -> rusqlite::Result<Vec<PersonnelRecord>> {
    let mut sql = personnel_select();
    sql.push_str(" WHERE year = ?");
    let mut binds: Vec<Value> = vec![Value::Integer(filter.year)];
    if let Some(unit) = &filter.unit {
        sql.push_str(" AND unit = ?");
        binds.push(Value::Text(unit.clone()));
    }
    if let Some(q) = &filter.search {
        sql.push_str(
            " AND (full_name LIKE ? OR national_id LIKE ? OR position_number LIKE ? OR position LIKE ?)",
        );
        let like = format!("%{}%", q);
        for _ in 0..4 {
            binds.push(Value::Text(like.clone()));
        }
    }
    if filter.active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY unit, position_number, id");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ? OFFSET ?");
        binds.push(Value::Integer(limit));
        binds.push(Value::Integer(filter.offset.unwrap_or(0)));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), personnel_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_personnel(conn: &Connection, id: &str) -> rusqlite::Result<Option<PersonnelRecord>> {
    let sql = format!("{} WHERE id = ?", personnel_select());
    conn.query_row(&sql, [id], personnel_from_row).optional()
}

pub fn insert_personnel(conn: &Connection, rec: &PersonnelRecord) -> rusqlite::Result<()> {
    let sql = format!(
        "INSERT INTO personnel(id, year, {}, {}, is_active, created_at, updated_at)
         VALUES({})",
        PERSON_COLS,
        SLOT_COLS,
        placeholders(2 + PERSON_COL_COUNT + 5 + 3)
    );
    let mut binds = vec![Value::Text(rec.id.clone()), Value::Integer(rec.year)];
    binds.extend(person_values(&rec.person));
    binds.extend(slot_values(&rec.slot));
    binds.push(Value::Integer(rec.is_active as i64));
    binds.push(text(&rec.created_at));
    binds.push(text(&rec.updated_at));
    conn.execute(&sql, params_from_iter(binds))?;
    Ok(())
}

/// Full overwrite of the editable columns; returns affected rows.
pub fn update_personnel(conn: &Connection, rec: &PersonnelRecord) -> rusqlite::Result<usize> {
    let sql = format!(
        "UPDATE personnel SET {}, {}, is_active = ?, updated_at = ? WHERE id = ?",
        assignments(PERSON_COLS),
        assignments(SLOT_COLS)
    );
    let mut binds = person_values(&rec.person);
    binds.extend(slot_values(&rec.slot));
    binds.push(Value::Integer(rec.is_active as i64));
    binds.push(Value::Text(now_ts()));
    binds.push(Value::Text(rec.id.clone()));
    conn.execute(&sql, params_from_iter(binds))
}

/// Overwrites only the person-identifying block of a position.
pub fn overwrite_person(
    conn: &Connection,
    personnel_id: &str,
    person: &PersonInfo,
) -> rusqlite::Result<usize> {
    let sql = format!(
        "UPDATE personnel SET {}, updated_at = ? WHERE id = ?",
        assignments(PERSON_COLS)
    );
    let mut binds = person_values(person);
    binds.push(Value::Text(now_ts()));
    binds.push(Value::Text(personnel_id.to_string()));
    conn.execute(&sql, params_from_iter(binds))
}

pub fn delete_personnel(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM personnel WHERE id = ?", [id])
}

pub fn delete_personnel_year(conn: &Connection, year: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM personnel WHERE year = ?", [year])
}

/// Live succession details that still point at this personnel row.
pub fn personnel_reference_count(conn: &Connection, personnel_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*)
         FROM swap_transaction_details d
         JOIN swap_transactions t ON t.id = d.transaction_id
         WHERE d.personnel_id = ? AND t.status <> 'cancelled'",
        [personnel_id],
        |r| r.get(0),
    )
}

// ---- vacant_positions --------------------------------------------------------

fn snapshot_select() -> String {
    format!(
        "SELECT id, year, {}, {}, is_assigned, display_order, requested_position_id,
                nominator, assigned_at, created_at, updated_at
         FROM vacant_positions",
        PERSON_COLS, SLOT_COLS
    )
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<VacantPositionSnapshot> {
    let assigned: i64 = row.get(23)?;
    Ok(VacantPositionSnapshot {
        id: row.get(0)?,
        year: row.get(1)?,
        person: person_from_row(row, 2)?,
        slot: slot_from_row(row, 2 + PERSON_COL_COUNT)?,
        is_assigned: assigned != 0,
        display_order: row.get(24)?,
        requested_position_id: row.get(25)?,
        nominator: row.get(26)?,
        assigned_at: row.get(27)?,
        created_at: row.get(28)?,
        updated_at: row.get(29)?,
    })
}

const PURE_VACANCY: &str = "nominator IS NULL AND requested_position_id IS NULL";

pub fn list_vacancy_rows(
    conn: &Connection,
    year: i64,
    unit: Option<&str>,
) -> rusqlite::Result<Vec<VacantPositionSnapshot>> {
    let mut sql = format!("{} WHERE year = ? AND {}", snapshot_select(), PURE_VACANCY);
    let mut binds = vec![Value::Integer(year)];
    if let Some(u) = unit {
        sql.push_str(" AND unit = ?");
        binds.push(Value::Text(u.to_string()));
    }
    sql.push_str(" ORDER BY unit, position_number, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), snapshot_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_applicants(
    conn: &Connection,
    year: i64,
    assigned: Option<bool>,
    requested_position_id: Option<i64>,
) -> rusqlite::Result<Vec<VacantPositionSnapshot>> {
    let mut sql = format!(
        "{} WHERE year = ? AND NOT ({})",
        snapshot_select(),
        PURE_VACANCY
    );
    let mut binds = vec![Value::Integer(year)];
    if let Some(a) = assigned {
        sql.push_str(" AND is_assigned = ?");
        binds.push(Value::Integer(a as i64));
    }
    if let Some(p) = requested_position_id {
        sql.push_str(" AND requested_position_id = ?");
        binds.push(Value::Integer(p));
    }
    sql.push_str(" ORDER BY display_order, created_at, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), snapshot_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_snapshot(
    conn: &Connection,
    id: &str,
) -> rusqlite::Result<Option<VacantPositionSnapshot>> {
    let sql = format!("{} WHERE id = ?", snapshot_select());
    conn.query_row(&sql, [id], snapshot_from_row).optional()
}

pub fn insert_snapshot(conn: &Connection, row: &VacantPositionSnapshot) -> rusqlite::Result<()> {
    let sql = format!(
        "INSERT INTO vacant_positions(id, year, {}, {}, is_assigned, display_order,
             requested_position_id, nominator, assigned_at, created_at, updated_at)
         VALUES({})",
        PERSON_COLS,
        SLOT_COLS,
        placeholders(2 + PERSON_COL_COUNT + 5 + 7)
    );
    let mut binds = vec![Value::Text(row.id.clone()), Value::Integer(row.year)];
    binds.extend(person_values(&row.person));
    binds.extend(slot_values(&row.slot));
    binds.push(Value::Integer(row.is_assigned as i64));
    binds.push(Value::Integer(row.display_order));
    binds.push(int(row.requested_position_id));
    binds.push(text(&row.nominator));
    binds.push(text(&row.assigned_at));
    binds.push(text(&row.created_at));
    binds.push(text(&row.updated_at));
    conn.execute(&sql, params_from_iter(binds))?;
    Ok(())
}

pub fn delete_snapshot(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM vacant_positions WHERE id = ?", [id])
}

/// Deletes vacancy-shaped rows only; applicant rows are never touched.
pub fn delete_vacancy_rows(
    conn: &Connection,
    year: i64,
    unit: Option<&str>,
) -> rusqlite::Result<usize> {
    match unit {
        Some(u) => conn.execute(
            &format!(
                "DELETE FROM vacant_positions WHERE year = ? AND unit = ? AND {}",
                PURE_VACANCY
            ),
            (year, u),
        ),
        None => conn.execute(
            &format!("DELETE FROM vacant_positions WHERE year = ? AND {}", PURE_VACANCY),
            [year],
        ),
    }
}

/// Composite keys of every vacancy-shaped row of the year.
pub fn vacancy_keys(conn: &Connection, year: i64) -> rusqlite::Result<HashSet<CompositeKey>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT position_number, unit, pos_code_id FROM vacant_positions
         WHERE year = ? AND {}",
        PURE_VACANCY
    ))?;
    let keys = stmt
        .query_map([year], |r| {
            let num: Option<String> = r.get(0)?;
            let unit: Option<String> = r.get(1)?;
            let code: Option<i64> = r.get(2)?;
            Ok(CompositeKey::new(year, num.as_deref(), unit.as_deref(), code))
        })?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}

pub fn set_applicant_assigned(
    conn: &Connection,
    id: &str,
    assigned: bool,
) -> rusqlite::Result<usize> {
    let now = now_ts();
    let assigned_at = if assigned { Some(now.clone()) } else { None };
    conn.execute(
        "UPDATE vacant_positions SET is_assigned = ?, assigned_at = ?, updated_at = ? WHERE id = ?",
        (assigned as i64, assigned_at, now, id),
    )
}

pub fn set_display_order(conn: &Connection, id: &str, order: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE vacant_positions SET display_order = ?, updated_at = ? WHERE id = ?",
        (order, now_ts(), id),
    )
}

pub fn next_display_order(conn: &Connection, year: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        &format!(
            "SELECT COALESCE(MAX(display_order), -1) + 1 FROM vacant_positions
             WHERE year = ? AND NOT ({})",
            PURE_VACANCY
        ),
        [year],
        |r| r.get(0),
    )
}

/// An applicant for the same requested position and year by the same person.
pub fn find_duplicate_applicant(
    conn: &Connection,
    year: i64,
    national_id: &str,
    requested_position_id: Option<i64>,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        &format!(
            "SELECT id FROM vacant_positions
             WHERE year = ? AND national_id = ? AND requested_position_id IS ?
               AND NOT ({})
             LIMIT 1",
            PURE_VACANCY
        ),
        (year, national_id, requested_position_id),
        |r| r.get(0),
    )
    .optional()
}

// ---- swap_transactions -------------------------------------------------------

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<SuccessionDetail> {
    let placeholder: i64 = row.get(16)?;
    Ok(SuccessionDetail {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        step: NewDetail {
            sequence: row.get(2)?,
            personnel_id: row.get(3)?,
            applicant_id: row.get(4)?,
            national_id: row.get(5)?,
            full_name: row.get(6)?,
            rank: row.get(7)?,
            from_pos_code_id: row.get(8)?,
            from_position: row.get(9)?,
            from_position_number: row.get(10)?,
            from_unit: row.get(11)?,
            to_pos_code_id: row.get(12)?,
            to_position: row.get(13)?,
            to_position_number: row.get(14)?,
            to_unit: row.get(15)?,
            is_placeholder: placeholder != 0,
            notes: row.get(17)?,
        },
    })
}

fn kind_from_sql(idx: usize, s: String) -> rusqlite::Result<SuccessionKind> {
    SuccessionKind::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown swap_type {}", s).into(),
        )
    })
}

fn status_from_sql(idx: usize, s: String) -> rusqlite::Result<TxStatus> {
    TxStatus::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown status {}", s).into(),
        )
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<SuccessionTransaction> {
    let completed: i64 = row.get(6)?;
    Ok(SuccessionTransaction {
        id: row.get(0)?,
        year: row.get(1)?,
        swap_date: row.get(2)?,
        swap_type: kind_from_sql(3, row.get(3)?)?,
        status: status_from_sql(4, row.get(4)?)?,
        group_name: row.get(5)?,
        is_completed: completed != 0,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        details: Vec::new(),
    })
}

const TX_COLS: &str =
    "id, year, swap_date, swap_type, status, group_name, is_completed, notes, created_at, updated_at";

pub fn insert_transaction(conn: &Connection, t: &SuccessionTransaction) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO swap_transactions({}) VALUES({})",
            TX_COLS,
            placeholders(10)
        ),
        params_from_iter(vec![
            Value::Text(t.id.clone()),
            Value::Integer(t.year),
            text(&t.swap_date),
            Value::Text(t.swap_type.as_str().to_string()),
            Value::Text(t.status.as_str().to_string()),
            text(&t.group_name),
            Value::Integer(t.is_completed as i64),
            text(&t.notes),
            text(&t.created_at),
            text(&t.updated_at),
        ]),
    )?;
    Ok(())
}

/// Create-many for participant rows.
pub fn insert_details(
    conn: &Connection,
    transaction_id: &str,
    details: &[NewDetail],
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "INSERT INTO swap_transaction_details(
            id, transaction_id, sequence, personnel_id, applicant_id, national_id, full_name,
            rank, from_pos_code_id, from_position, from_position_number, from_unit,
            to_pos_code_id, to_position, to_position_number, to_unit, is_placeholder, notes)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    let mut ids = Vec::with_capacity(details.len());
    for d in details {
        let id = uuid::Uuid::new_v4().to_string();
        stmt.execute(params_from_iter(vec![
            Value::Text(id.clone()),
            Value::Text(transaction_id.to_string()),
            Value::Integer(d.sequence),
            text(&d.personnel_id),
            text(&d.applicant_id),
            text(&d.national_id),
            text(&d.full_name),
            text(&d.rank),
            int(d.from_pos_code_id),
            text(&d.from_position),
            text(&d.from_position_number),
            text(&d.from_unit),
            int(d.to_pos_code_id),
            text(&d.to_position),
            text(&d.to_position_number),
            text(&d.to_unit),
            Value::Integer(d.is_placeholder as i64),
            text(&d.notes),
        ]))?;
        ids.push(id);
    }
    Ok(ids)
}

pub fn delete_details(conn: &Connection, transaction_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM swap_transaction_details WHERE transaction_id = ?",
        [transaction_id],
    )
}

pub fn delete_transaction(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM swap_transactions WHERE id = ?", [id])
}

pub fn details_of(conn: &Connection, transaction_id: &str) -> rusqlite::Result<Vec<SuccessionDetail>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM swap_transaction_details d WHERE d.transaction_id = ? ORDER BY d.sequence",
        DETAIL_COLS
    ))?;
    let rows = stmt
        .query_map([transaction_id], detail_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_transaction(
    conn: &Connection,
    id: &str,
) -> rusqlite::Result<Option<SuccessionTransaction>> {
    let t = conn
        .query_row(
            &format!("SELECT {} FROM swap_transactions WHERE id = ?", TX_COLS),
            [id],
            transaction_from_row,
        )
        .optional()?;
    match t {
        Some(mut t) => {
            t.details = details_of(conn, &t.id)?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

pub fn list_transactions(
    conn: &Connection,
    year: i64,
    status: Option<TxStatus>,
    kind: Option<SuccessionKind>,
) -> rusqlite::Result<Vec<SuccessionTransaction>> {
    let mut sql = format!("SELECT {} FROM swap_transactions WHERE year = ?", TX_COLS);
    let mut binds = vec![Value::Integer(year)];
    if let Some(s) = status {
        sql.push_str(" AND status = ?");
        binds.push(Value::Text(s.as_str().to_string()));
    }
    if let Some(k) = kind {
        sql.push_str(" AND swap_type = ?");
        binds.push(Value::Text(k.as_str().to_string()));
    }
    sql.push_str(" ORDER BY created_at, id");
    let mut stmt = conn.prepare(&sql)?;
    let mut txs = stmt
        .query_map(params_from_iter(binds), transaction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for t in txs.iter_mut() {
        t.details = details_of(conn, &t.id)?;
    }
    Ok(txs)
}

pub fn set_transaction_status(
    conn: &Connection,
    id: &str,
    status: TxStatus,
    is_completed: Option<bool>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE swap_transactions
         SET status = ?, is_completed = COALESCE(?, is_completed), updated_at = ?
         WHERE id = ?",
        (status.as_str(), is_completed.map(|b| b as i64), now_ts(), id),
    )
}

pub fn append_transaction_note(conn: &Connection, id: &str, note: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE swap_transactions
         SET notes = CASE WHEN notes IS NULL OR notes = '' THEN ?1 ELSE notes || char(10) || ?1 END,
             updated_at = ?2
         WHERE id = ?3",
        (note, now_ts(), id),
    )
}

/// Details joined with their transaction, restricted to `statuses`, in the
/// order the succession index treats as "first encountered": transaction
/// creation time, then transaction id, then sequence.
pub fn load_indexed_details(
    conn: &Connection,
    year: i64,
    statuses: &[TxStatus],
) -> rusqlite::Result<Vec<IndexedDetail>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {}, t.swap_type, t.status, t.year
         FROM swap_transaction_details d
         JOIN swap_transactions t ON t.id = d.transaction_id
         WHERE t.year = ? AND t.status IN ({})
         ORDER BY t.created_at, t.id, d.sequence",
        DETAIL_COLS,
        placeholders(statuses.len())
    );
    let mut binds = vec![Value::Integer(year)];
    binds.extend(statuses.iter().map(|s| Value::Text(s.as_str().to_string())));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), |row| {
            Ok(IndexedDetail {
                detail: detail_from_row(row)?,
                kind: kind_from_sql(18, row.get(18)?)?,
                status: status_from_sql(19, row.get(19)?)?,
                year: row.get(20)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Non-cancelled vacant-assignment transactions that reference an applicant.
pub fn live_assignment_transactions_for(
    conn: &Connection,
    applicant_id: &str,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.id
         FROM swap_transactions t
         JOIN swap_transaction_details d ON d.transaction_id = t.id
         WHERE d.applicant_id = ? AND t.swap_type = 'vacant-assignment'
           AND t.status <> 'cancelled'
         ORDER BY t.id",
    )?;
    let ids = stmt
        .query_map([applicant_id], |r| r.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

// ---- pos_code_master ---------------------------------------------------------

pub fn list_pos_codes(conn: &Connection) -> rusqlite::Result<Vec<PosCode>> {
    let mut stmt =
        conn.prepare("SELECT pos_code_id, pos_code_name FROM pos_code_master ORDER BY pos_code_id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(PosCode {
                pos_code_id: r.get(0)?,
                pos_code_name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn upsert_pos_code(conn: &Connection, code: &PosCode) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pos_code_master(pos_code_id, pos_code_name) VALUES(?, ?)
         ON CONFLICT(pos_code_id) DO UPDATE SET pos_code_name = excluded.pos_code_name",
        (code.pos_code_id, &code.pos_code_name),
    )?;
    Ok(())
}

pub fn pos_code_names(conn: &Connection) -> rusqlite::Result<HashMap<i64, String>> {
    Ok(list_pos_codes(conn)?
        .into_iter()
        .map(|c| (c.pos_code_id, c.pos_code_name))
        .collect())
}
