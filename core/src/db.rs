use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{DailyLogEntry, User};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS daily_logs (
                    uid TEXT NOT NULL,
                    date TEXT NOT NULL,
                    weight REAL,
                    has_food INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (uid, date)
                );

                CREATE TABLE IF NOT EXISTS food_items (
                    uid TEXT NOT NULL,
                    date TEXT NOT NULL,
                    item TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    UNIQUE (uid, date, item),
                    FOREIGN KEY (uid, date) REFERENCES daily_logs(uid, date)
                );

                CREATE INDEX IF NOT EXISTS idx_food_items_day ON food_items(uid, date, position);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS accounts (
                    uid TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    display_name TEXT,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Daily logs ---

    /// All entries for `uid`, ascending by date.
    pub fn list_entries(&self, uid: &str) -> Result<Vec<DailyLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, weight, has_food FROM daily_logs
             WHERE uid = ?1 ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map(params![uid], |row| {
                let date: String = row.get(0)?;
                let weight: Option<f64> = row.get(1)?;
                let has_food: bool = row.get(2)?;
                Ok((date, weight, has_food))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (date, weight, has_food) in rows {
            let food = if has_food {
                Some(self.food_for_date(uid, &date)?)
            } else {
                None
            };
            entries.push(DailyLogEntry { date, weight, food });
        }
        Ok(entries)
    }

    pub fn get_entry(&self, uid: &str, date: &str) -> Result<Option<DailyLogEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT weight, has_food FROM daily_logs WHERE uid = ?1 AND date = ?2",
                params![uid, date],
                |row| {
                    let weight: Option<f64> = row.get(0)?;
                    let has_food: bool = row.get(1)?;
                    Ok((weight, has_food))
                },
            )
            .optional()?;

        match row {
            Some((weight, has_food)) => {
                let food = if has_food {
                    Some(self.food_for_date(uid, date)?)
                } else {
                    None
                };
                Ok(Some(DailyLogEntry {
                    date: date.to_string(),
                    weight,
                    food,
                }))
            }
            None => Ok(None),
        }
    }

    fn food_for_date(&self, uid: &str, date: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT item FROM food_items WHERE uid = ?1 AND date = ?2 ORDER BY position ASC",
        )?;
        let items = stmt
            .query_map(params![uid, date], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(items)
    }

    /// Create the day's row if missing. Leaves existing fields alone.
    fn ensure_entry(&self, uid: &str, date: &str, now: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO daily_logs (uid, date, weight, has_food, created_at, updated_at)
             VALUES (?1, ?2, NULL, 0, ?3, ?3)",
            params![uid, date, now],
        )?;
        Ok(())
    }

    /// Merge-upsert: sets `weight` only, creating the entry if absent.
    pub fn merge_weight(&self, uid: &str, date: &str, weight: f64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO daily_logs (uid, date, weight, has_food, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)
             ON CONFLICT(uid, date) DO UPDATE SET
                weight = excluded.weight,
                updated_at = excluded.updated_at",
            params![uid, date, weight, now],
        )?;
        Ok(())
    }

    /// Set-union append. Returns `false` when the item was already present.
    pub fn append_food(&self, uid: &str, date: &str, item: &str) -> Result<bool> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        self.ensure_entry(uid, date, &now)?;
        tx.execute(
            "UPDATE daily_logs SET has_food = 1, updated_at = ?3 WHERE uid = ?1 AND date = ?2",
            params![uid, date, now],
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO food_items (uid, date, item, position)
             VALUES (?1, ?2, ?3,
                (SELECT COALESCE(MAX(position), -1) + 1
                 FROM food_items WHERE uid = ?1 AND date = ?2))",
            params![uid, date, item],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Set-element removal by exact match. Returns `false` when nothing matched.
    pub fn remove_food(&self, uid: &str, date: &str, item: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM food_items WHERE uid = ?1 AND date = ?2 AND item = ?3",
            params![uid, date, item],
        )?;
        if removed > 0 {
            let now = Local::now().to_rfc3339();
            self.conn.execute(
                "UPDATE daily_logs SET updated_at = ?3 WHERE uid = ?1 AND date = ?2",
                params![uid, date, now],
            )?;
        }
        Ok(removed > 0)
    }

    // --- Local accounts ---

    /// Find the account for `email`, creating it on first sign-in. A new
    /// display name replaces the stored one.
    pub fn find_or_create_account(&self, email: &str, display_name: Option<&str>) -> Result<User> {
        let existing = self
            .conn
            .query_row(
                "SELECT uid, display_name FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    let uid: String = row.get(0)?;
                    let name: Option<String> = row.get(1)?;
                    Ok((uid, name))
                },
            )
            .optional()?;

        match existing {
            Some((uid, stored_name)) => {
                let display_name = match display_name {
                    Some(name) => {
                        self.conn.execute(
                            "UPDATE accounts SET display_name = ?1 WHERE uid = ?2",
                            params![name, uid],
                        )?;
                        Some(name.to_string())
                    }
                    None => stored_name,
                };
                Ok(User {
                    uid,
                    display_name,
                    email: Some(email.to_string()),
                })
            }
            None => {
                let uid = Uuid::new_v4().simple().to_string();
                let now = Local::now().to_rfc3339();
                self.conn.execute(
                    "INSERT INTO accounts (uid, email, display_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![uid, email, display_name, now],
                )?;
                Ok(User {
                    uid,
                    display_name: display_name.map(str::to_string),
                    email: Some(email.to_string()),
                })
            }
        }
    }

    pub fn get_account(&self, uid: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT uid, display_name, email FROM accounts WHERE uid = ?1",
                params![uid],
                |row| {
                    Ok(User {
                        uid: row.get(0)?,
                        display_name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
