//! SQLite database operations for the analytics bot.
//!
//! Holds the seeded financials, the per-user metric selection, and the
//! passive message log.

use rusqlite::{Connection, Result as SqliteResult};
use std::sync::Mutex;
use whatsapp_analytics_types::*;

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        db.seed_financials()?;
        Ok(db)
    }

    fn create_tables(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                from_number TEXT NOT NULL,
                message_text TEXT NOT NULL,
                direction TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS financials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                company_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                revenue REAL,
                cogs REAL,
                ebitda REAL,
                sales REAL,
                inventory REAL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_financials_company_date
             ON financials(company_id, date)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_state (
                user_number TEXT PRIMARY KEY,
                last_choice TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert the sample dataset, only when the table is empty.
    fn seed_financials(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM financials", [], |r| r.get(0))?;
        if count > 0 {
            return Ok(());
        }
        conn.execute_batch(
            "INSERT INTO financials (date, company_id, name, revenue, cogs, ebitda, sales, inventory) VALUES
             ('2025-01-15', 100, 'Global Ops', 1000000, 400000, 600000, 500000, 100),
             ('2025-02-15', 100, 'Global Ops', 1200000, 500000, 700000, 600000, 200),
             ('2025-03-15', 100, 'Global Ops', 1300000, 550000, 750000, 300000, 300),
             ('2024-01-15', 100, 'Global Ops', 900000, 380000, 520000, 200000, 400),
             ('2024-02-15', 100, 'Global Ops', 950000, 400000, 550000, 100000, 500),
             ('2024-03-15', 100, 'Global Ops', 1000000, 420000, 580000, 500000, 600);",
        )?;
        log::info!("Sample financial data inserted");
        Ok(())
    }

    /// Sum one metric over an inclusive date range for a single company.
    ///
    /// Dates are ISO `YYYY-MM-DD` strings and the `date` column is TEXT, so
    /// `BETWEEN` compares lexicographically. An empty (or inverted) range
    /// sums to 0.
    pub fn sum_metric(
        &self,
        metric: Metric,
        company_id: i64,
        from_date: &str,
        to_date: &str,
    ) -> Result<f64, String> {
        let conn = self.conn.lock().unwrap();
        // The column name comes from the Metric enum, never from user text.
        let sql = format!(
            "SELECT COALESCE(SUM({}), 0)
             FROM financials
             WHERE date BETWEEN ?1 AND ?2 AND company_id = ?3",
            metric.column()
        );
        conn.query_row(&sql, rusqlite::params![from_date, to_date, company_id], |r| {
            r.get(0)
        })
        .map_err(|e| format!("Failed to sum {}: {}", metric.column(), e))
    }

    /// Last metric the user picked from the menu, if any. An unknown stored
    /// value is treated as no selection.
    pub fn get_selection(&self, user_number: &str) -> Result<Option<Metric>, String> {
        let conn = self.conn.lock().unwrap();
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT last_choice FROM user_state WHERE user_number = ?1",
            rusqlite::params![user_number],
            |r| r.get(0),
        );
        match result {
            Ok(choice) => Ok(Metric::parse_name(&choice)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Failed to read selection: {}", e)),
        }
    }

    /// Remember the user's menu choice. Last write wins, no history.
    pub fn set_selection(&self, user_number: &str, metric: Metric) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_state (user_number, last_choice) VALUES (?1, ?2)",
            rusqlite::params![user_number, metric.column()],
        )
        .map_err(|e| format!("Failed to store selection: {}", e))?;
        Ok(())
    }

    /// Append an inbound ("in") or outbound ("out") message to the log.
    pub fn log_message(
        &self,
        from_number: &str,
        message_text: &str,
        direction: &str,
    ) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (from_number, message_text, direction) VALUES (?1, ?2, ?3)",
            rusqlite::params![from_number, message_text, direction],
        )
        .map_err(|e| format!("Failed to log message: {}", e))?;
        Ok(())
    }

    /// Most recent log entries, newest first.
    pub fn recent_messages(&self, limit: i64) -> Result<Vec<MessageLogEntry>, String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, from_number, message_text, direction, created_at
                 FROM messages
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare query: {}", e))?;

        let entries = stmt
            .query_map(rusqlite::params![limit], |row| {
                Ok(MessageLogEntry {
                    id: row.get(0)?,
                    from_number: row.get(1)?,
                    message_text: row.get(2)?,
                    direction: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| format!("Failed to query: {}", e))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// All financial records, oldest first.
    pub fn list_financials(&self) -> Result<Vec<FinancialRecord>, String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, date, company_id, name, revenue, cogs, ebitda, sales, inventory
                 FROM financials
                 ORDER BY date ASC, id ASC",
            )
            .map_err(|e| format!("Failed to prepare query: {}", e))?;

        let records = stmt
            .query_map([], |row| {
                Ok(FinancialRecord {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    company_id: row.get(2)?,
                    name: row.get(3)?,
                    revenue: row.get(4)?,
                    cogs: row.get(5)?,
                    ebitda: row.get(6)?,
                    sales: row.get(7)?,
                    inventory: row.get(8)?,
                })
            })
            .map_err(|e| format!("Failed to query: {}", e))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(records)
    }

    pub fn message_count(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))
            .unwrap_or(0)
    }

    pub fn financial_record_count(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM financials", [], |r| r.get(0))
            .unwrap_or(0)
    }
}
