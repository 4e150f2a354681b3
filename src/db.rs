use crate::config::{EngineConfig, TxBudget};
use crate::error::{EngineError, EngineResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Instant;

pub fn open_db(workspace: &Path, cfg: &EngineConfig) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(&cfg.database_file);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pos_code_master(
            pos_code_id INTEGER PRIMARY KEY,
            pos_code_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS personnel(
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            national_id TEXT,
            full_name TEXT,
            rank TEXT,
            seniority TEXT,
            age TEXT,
            birth_date TEXT,
            appointment_date TEXT,
            rank_since TEXT,
            enrollment_date TEXT,
            retirement_date TEXT,
            years_of_service TEXT,
            training_location TEXT,
            training_course TEXT,
            supporter_name TEXT,
            support_reason TEXT,
            notes TEXT,
            pos_code_id INTEGER,
            position TEXT,
            position_number TEXT,
            unit TEXT,
            acting_as TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_personnel_year ON personnel(year)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_personnel_year_posnum ON personnel(year, position_number)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_personnel_national_id ON personnel(national_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS swap_transactions(
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            swap_date TEXT,
            swap_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            group_name TEXT,
            is_completed INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swap_transactions_year ON swap_transactions(year, status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS swap_transaction_details(
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            personnel_id TEXT,
            national_id TEXT,
            full_name TEXT,
            rank TEXT,
            from_pos_code_id INTEGER,
            from_position TEXT,
            from_position_number TEXT,
            from_unit TEXT,
            to_pos_code_id INTEGER,
            to_position TEXT,
            to_position_number TEXT,
            to_unit TEXT,
            is_placeholder INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            FOREIGN KEY(transaction_id) REFERENCES swap_transactions(id),
            UNIQUE(transaction_id, sequence)
        )",
        [],
    )?;
    // Workspaces created before applicant tracking lack this column.
    ensure_details_applicant_id(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swap_details_tx ON swap_transaction_details(transaction_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swap_details_national_id ON swap_transaction_details(national_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swap_details_applicant ON swap_transaction_details(applicant_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS vacant_positions(
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            national_id TEXT,
            full_name TEXT,
            rank TEXT,
            seniority TEXT,
            age TEXT,
            birth_date TEXT,
            appointment_date TEXT,
            rank_since TEXT,
            enrollment_date TEXT,
            retirement_date TEXT,
            years_of_service TEXT,
            training_location TEXT,
            training_course TEXT,
            supporter_name TEXT,
            support_reason TEXT,
            notes TEXT,
            pos_code_id INTEGER,
            position TEXT,
            position_number TEXT,
            unit TEXT,
            acting_as TEXT,
            is_assigned INTEGER NOT NULL DEFAULT 0,
            display_order INTEGER NOT NULL DEFAULT 0,
            requested_position_id INTEGER,
            nominator TEXT,
            assigned_at TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vacant_positions_year ON vacant_positions(year, unit)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vacant_positions_slot
         ON vacant_positions(year, position_number, unit, pos_code_id)",
        [],
    )?;

    Ok(())
}

fn ensure_details_applicant_id(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "swap_transaction_details", "applicant_id")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE swap_transaction_details ADD COLUMN applicant_id TEXT",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Runs `f` inside an IMMEDIATE transaction bounded by `budget`.
///
/// `budget.wait` caps how long we block on another writer's lock;
/// `budget.total` caps the whole unit of work. Lock contention or an
/// overrun rolls everything back and surfaces as `TransientStorage`.
pub fn with_budget<T>(
    conn: &Connection,
    budget: TxBudget,
    f: impl FnOnce(&Transaction<'_>) -> EngineResult<T>,
) -> EngineResult<T> {
    conn.busy_timeout(budget.wait)
        .map_err(EngineError::from_storage)?;
    let started = Instant::now();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(EngineError::from_storage)?;

    let out = match f(&tx) {
        Ok(v) => v,
        Err(EngineError::Storage(e)) => {
            let _ = tx.rollback();
            return Err(EngineError::from_storage(e));
        }
        Err(e) => {
            let _ = tx.rollback();
            return Err(e);
        }
    };

    let elapsed = started.elapsed();
    if elapsed > budget.total {
        let _ = tx.rollback();
        return Err(EngineError::TransientStorage(format!(
            "transaction took {} ms, budget is {} ms",
            elapsed.as_millis(),
            budget.total.as_millis()
        )));
    }
    tx.commit().map_err(EngineError::from_storage)?;
    Ok(out)
}
