use std::path::Path;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};
use tokio::sync::Mutex;

use crate::error::{LoadError, QueryError};
use crate::model::{Drg, DrgFilter, NewObservation, Observation, RecordFilter};
use crate::storage::file_present_nonempty;

pub const TABLE: &str = "medicare_ip_geo_service";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS medicare_ip_geo_service (
        id INTEGER PRIMARY KEY,
        rndrng_prvdr_geo_lvl TEXT NOT NULL,
        rndrng_prvdr_geo_cd TEXT,
        rndrng_prvdr_geo_desc TEXT NOT NULL,
        drg_cd INTEGER NOT NULL,
        drg_desc TEXT NOT NULL,
        tot_dschrgs INTEGER NOT NULL,
        avg_submtd_cvrd_chrg REAL NOT NULL,
        avg_tot_pymt_amt REAL NOT NULL,
        avg_mdcr_pymt_amt REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_geo_service_geo
        ON medicare_ip_geo_service(rndrng_prvdr_geo_lvl, rndrng_prvdr_geo_desc);
    CREATE INDEX IF NOT EXISTS idx_geo_service_drg
        ON medicare_ip_geo_service(drg_cd);
"#;

const OBSERVATION_COLUMNS: &str = r#"
    id,
    rndrng_prvdr_geo_lvl,
    rndrng_prvdr_geo_cd,
    rndrng_prvdr_geo_desc,
    drg_cd,
    drg_desc,
    tot_dschrgs,
    avg_submtd_cvrd_chrg,
    avg_tot_pymt_amt,
    avg_mdcr_pymt_amt
"#;

/// Counts reported by a full replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: usize,
    pub inserted: usize,
}

/// Shared handle to the SQLite record store.
///
/// Cloning is cheap; every clone talks to the same connection. Readers take the lock
/// for one statement at a time, a full replace holds it for the whole transaction.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    /// Opens an existing store for serving. Fails when the file is missing or was never loaded.
    pub fn open_read_only(path: &Path) -> Result<Self, QueryError> {
        if !file_present_nonempty(path) {
            return Err(QueryError::Unavailable(format!(
                "SQLite DB not found at {}. Run: drg-explorer load",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| QueryError::Unavailable(format!("open {}: {e}", path.display())))?;

        if !table_exists(&conn, TABLE)? {
            return Err(QueryError::Unavailable(format!(
                "table {TABLE} missing in {}. Run: drg-explorer load",
                path.display()
            )));
        }
        Ok(Self::from_connection(conn))
    }

    /// Opens (creating if needed) a store for loading.
    pub fn open_read_write(path: &Path) -> Result<Self, LoadError> {
        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!("journal_mode={mode} for {}", path.display());
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite");
        conn.execute_batch(SCHEMA).expect("create schema");
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Deletes every observation and inserts `rows` in batches, all inside one transaction.
    ///
    /// `on_batch` receives the size of each inserted batch. Any error
    /// drops the transaction, which rolls back both the delete and the partial inserts.
    pub async fn replace_all(
        &self,
        rows: &[NewObservation],
        batch_size: usize,
        mut on_batch: impl FnMut(usize),
    ) -> Result<ReplaceOutcome, LoadError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let deleted = tx.execute(&format!("DELETE FROM {TABLE}"), [])?;
        tracing::info!("Deleted {} existing records", deleted);

        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO medicare_ip_geo_service (
                    rndrng_prvdr_geo_lvl,
                    rndrng_prvdr_geo_cd,
                    rndrng_prvdr_geo_desc,
                    drg_cd,
                    drg_desc,
                    tot_dschrgs,
                    avg_submtd_cvrd_chrg,
                    avg_tot_pymt_amt,
                    avg_mdcr_pymt_amt
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for batch in rows.chunks(batch_size.max(1)) {
                for row in batch {
                    stmt.execute(params![
                        row.geo_level,
                        row.geo_code,
                        row.geo_description,
                        row.drg_code,
                        row.drg_description,
                        row.total_discharges,
                        row.avg_submitted_charge,
                        row.avg_total_payment,
                        row.avg_medicare_payment,
                    ])?;
                }
                inserted += batch.len();
                tracing::debug!("inserted batch of {} ({} / {})", batch.len(), inserted, rows.len());
                on_batch(batch.len());
            }
        }
        tx.commit()?;

        Ok(ReplaceOutcome { deleted, inserted })
    }

    pub async fn count(&self) -> Result<u64, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let v: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
            row.get(0)
        })?;
        Ok(v.max(0) as u64)
    }

    /// Lowest-id row, used as the post-load sample.
    pub async fn first(&self) -> Result<Option<Observation>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {OBSERVATION_COLUMNS} FROM {TABLE} ORDER BY id ASC LIMIT 1");
        conn.query_row(&sql, [], observation_from_row).optional()
    }

    pub async fn distinct_levels(&self) -> Result<Vec<String>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let sql = format!(
            r#"
            SELECT DISTINCT rndrng_prvdr_geo_lvl AS level
            FROM {TABLE}
            WHERE rndrng_prvdr_geo_lvl IS NOT NULL
            ORDER BY level ASC
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<usize, String>(0))?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Distinct geography names for one level, optionally narrowed by a
    /// case-insensitive substring.
    pub async fn distinct_geographies(
        &self,
        level: &str,
        contains: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, rusqlite::Error> {
        let mut where_sql = String::from(
            "WHERE rndrng_prvdr_geo_lvl = ? AND rndrng_prvdr_geo_desc IS NOT NULL",
        );
        let mut args = vec![Value::Text(level.to_string())];
        if let Some(text) = contains {
            where_sql.push_str(" AND instr(lower(rndrng_prvdr_geo_desc), lower(?)) > 0");
            args.push(Value::Text(text.to_string()));
        }
        args.push(Value::Integer(limit as i64));

        let sql = format!(
            r#"
            SELECT DISTINCT rndrng_prvdr_geo_desc AS description
            FROM {TABLE}
            {where_sql}
            ORDER BY description ASC
            LIMIT ?
            "#
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| row.get::<usize, String>(0))?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    pub async fn distinct_drgs(
        &self,
        filter: &DrgFilter,
        limit: usize,
    ) -> Result<Vec<Drg>, rusqlite::Error> {
        let mut where_sql = String::from("WHERE drg_cd IS NOT NULL AND drg_desc IS NOT NULL");
        let mut args = Vec::new();
        match filter {
            DrgFilter::All => {}
            DrgFilter::ExactCode(code) => {
                where_sql.push_str(" AND drg_cd = ?");
                args.push(Value::Integer(*code));
            }
            DrgFilter::TextContains(text) => {
                where_sql.push_str(" AND instr(lower(drg_desc), lower(?)) > 0");
                args.push(Value::Text(text.clone()));
            }
        }
        args.push(Value::Integer(limit as i64));

        let sql = format!(
            r#"
            SELECT DISTINCT drg_cd AS code, drg_desc AS description
            FROM {TABLE}
            {where_sql}
            ORDER BY code ASC, description ASC
            LIMIT ?
            "#
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok(Drg {
                code: row.get(0)?,
                description: row.get(1)?,
            })
        })?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Observations matching the filter, highest submitted charge first.
    pub async fn records(
        &self,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<Observation>, rusqlite::Error> {
        let mut where_sql =
            String::from("WHERE rndrng_prvdr_geo_lvl = ? AND rndrng_prvdr_geo_desc = ?");
        let mut args = vec![
            Value::Text(filter.geo_level.clone()),
            Value::Text(filter.geo_description.clone()),
        ];
        if let Some(code) = filter.drg_code {
            // REAL binding: 470.0 equals the stored 470, 1.5 equals nothing.
            where_sql.push_str(" AND drg_cd = ?");
            args.push(Value::Real(code));
        }
        args.push(Value::Integer(limit as i64));

        let sql = format!(
            r#"
            SELECT {OBSERVATION_COLUMNS}
            FROM {TABLE}
            {where_sql}
            ORDER BY avg_submtd_cvrd_chrg DESC, id ASC
            LIMIT ?
            "#
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), observation_from_row)?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<Observation> {
    Ok(Observation {
        id: row.get(0)?,
        geo_level: row.get(1)?,
        geo_code: row.get(2)?,
        geo_description: row.get(3)?,
        drg_code: row.get(4)?,
        drg_description: row.get(5)?,
        total_discharges: row.get(6)?,
        avg_submitted_charge: row.get(7)?,
        avg_total_payment: row.get(8)?,
        avg_medicare_payment: row.get(9)?,
    })
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
