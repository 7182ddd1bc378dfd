use crate::model::{Alert, PriceReading, StorageError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

#[cfg(test)]
use crate::model::AlertReason;
#[cfg(test)]
use rusqlite::Row;

/// One row of the price history table.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub timestamp: DateTime<Utc>,
    pub site: String,
    pub title: String,
    pub price: String,
    pub url: String,
}

/// Append-only price history and alert log.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database and runs the migrations.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn migrate(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                site TEXT NOT NULL,
                title TEXT NOT NULL,
                price TEXT NOT NULL,
                url TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_price_history_site
                ON price_history (site, timestamp);

            CREATE TABLE IF NOT EXISTS alert_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                site TEXT NOT NULL,
                title TEXT NOT NULL,
                current_price TEXT NOT NULL,
                previous_price TEXT NOT NULL,
                price_formatted TEXT NOT NULL,
                url TEXT NOT NULL,
                reasons TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Appends one history row per reading, all stamped with the cycle timestamp.
    pub fn append_history(&mut self, readings: &[PriceReading], cycle_at: DateTime<Utc>) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO price_history (timestamp, site, title, price, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for reading in readings {
                stmt.execute(params![
                    cycle_at.to_rfc3339(),
                    &reading.site,
                    &reading.title,
                    &reading.display,
                    &reading.url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn append_alerts(&mut self, alerts: &[Alert]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO alert_log (
                    timestamp, site, title, current_price, previous_price,
                    price_formatted, url, reasons
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for alert in alerts {
                stmt.execute(params![
                    alert.timestamp.to_rfc3339(),
                    &alert.site,
                    &alert.title,
                    alert.current_price.to_string(),
                    alert.previous_price.to_string(),
                    &alert.price_formatted,
                    &alert.url,
                    serde_json::to_string(&alert.reasons)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// History rows for a site, oldest first.
    #[cfg(test)]
    pub fn history_for_site(&self, site: &str) -> Result<Vec<HistoryRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, site, title, price, url
             FROM price_history WHERE site = ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![site], Self::map_history)?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    /// Reasons of every logged alert for a site, oldest first.
    #[cfg(test)]
    pub fn alert_reasons_for_site(&self, site: &str) -> Result<Vec<Vec<AlertReason>>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT reasons FROM alert_log WHERE site = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![site], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(serde_json::from_str(&row?)?);
        }
        Ok(result)
    }

    #[cfg(test)]
    pub fn count_alerts(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM alert_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[cfg(test)]
    fn map_history(row: &Row) -> Result<HistoryRow, rusqlite::Error> {
        let timestamp_str: String = row.get(0)?;
        let timestamp = timestamp_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(HistoryRow {
            timestamp,
            site: row.get(1)?,
            title: row.get(2)?,
            price: row.get(3)?,
            url: row.get(4)?,
        })
    }
}
