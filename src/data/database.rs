//! SQLite storage for normalized fight history

use crate::data::normalize::CompetitorProfile;
use crate::{CompetitorAttributes, FightError, FightRecord, Outcome, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const FIGHT_COLUMNS: &str = "event, date, location, fighter_a, fighter_b, outcome, method,
     ending_round, ending_time_sec, time_format, weight_class, referee,
     stats_a, stats_b, attributes_a, attributes_b";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fighters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                height REAL,
                weight REAL,
                reach REAL,
                stance TEXT,
                dob TEXT
            );

            CREATE TABLE IF NOT EXISTS fights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event TEXT NOT NULL,
                date TEXT NOT NULL,
                location TEXT,
                fighter_a TEXT NOT NULL,
                fighter_b TEXT NOT NULL,
                outcome TEXT NOT NULL,
                method TEXT,
                ending_round INTEGER,
                ending_time_sec INTEGER,
                time_format TEXT,
                weight_class TEXT,
                referee TEXT,
                stats_a TEXT,
                stats_b TEXT,
                attributes_a TEXT NOT NULL,
                attributes_b TEXT NOT NULL,
                UNIQUE(event, fighter_a, fighter_b)
            );

            CREATE INDEX IF NOT EXISTS idx_fights_date ON fights(date);
            CREATE INDEX IF NOT EXISTS idx_fights_a ON fights(fighter_a);
            CREATE INDEX IF NOT EXISTS idx_fights_b ON fights(fighter_b);
            "#,
        )?;
        Ok(())
    }

    // ==================== Fighter Operations ====================

    /// Insert or update a competitor's attribute record
    pub fn upsert_fighter(&self, profile: &CompetitorProfile) -> Result<()> {
        let attrs = &profile.attributes;
        self.conn.execute(
            r#"
            INSERT INTO fighters (name, height, weight, reach, stance, dob)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                height = excluded.height,
                weight = excluded.weight,
                reach = excluded.reach,
                stance = excluded.stance,
                dob = excluded.dob
            "#,
            params![
                profile.name,
                attrs.height,
                attrs.weight,
                attrs.reach,
                attrs.stance,
                attrs.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(())
    }

    /// Insert multiple competitor records in one transaction
    pub fn upsert_fighters(&self, profiles: &[CompetitorProfile]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for profile in profiles {
            self.upsert_fighter(profile)?;
        }
        tx.commit()?;
        Ok(profiles.len())
    }

    /// Find a competitor by name, ignoring case
    pub fn find_fighter(&self, name: &str) -> Result<Option<CompetitorProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT name, height, weight, reach, stance, dob FROM fighters
                 WHERE LOWER(name) = LOWER(?1)",
                params![name],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Competitor names matching a substring, ignoring case
    pub fn search_fighters(&self, text: &str) -> Result<Vec<CompetitorProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, height, weight, reach, stance, dob FROM fighters
             WHERE LOWER(name) LIKE '%' || LOWER(?1) || '%'
             ORDER BY name",
        )?;
        let profiles = stmt
            .query_map(params![text], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<CompetitorProfile> {
        let dob: Option<String> = row.get(5)?;
        Ok(CompetitorProfile {
            name: row.get(0)?,
            attributes: CompetitorAttributes {
                height: row.get(1)?,
                weight: row.get(2)?,
                reach: row.get(3)?,
                stance: row.get(4)?,
                date_of_birth: dob.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            },
        })
    }

    // ==================== Fight Operations ====================

    /// Insert or update a fight record
    pub fn upsert_fight(&self, record: &FightRecord) -> Result<()> {
        let stats_a = record.stats_a.as_ref().map(serde_json::to_string).transpose()?;
        let stats_b = record.stats_b.as_ref().map(serde_json::to_string).transpose()?;
        let attributes_a = serde_json::to_string(&record.attributes_a)?;
        let attributes_b = serde_json::to_string(&record.attributes_b)?;

        self.conn.execute(
            &format!(
                r#"
                INSERT INTO fights ({FIGHT_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(event, fighter_a, fighter_b) DO UPDATE SET
                    date = excluded.date,
                    location = COALESCE(excluded.location, location),
                    outcome = excluded.outcome,
                    method = COALESCE(excluded.method, method),
                    ending_round = COALESCE(excluded.ending_round, ending_round),
                    ending_time_sec = COALESCE(excluded.ending_time_sec, ending_time_sec),
                    time_format = COALESCE(excluded.time_format, time_format),
                    weight_class = COALESCE(excluded.weight_class, weight_class),
                    referee = COALESCE(excluded.referee, referee),
                    stats_a = COALESCE(excluded.stats_a, stats_a),
                    stats_b = COALESCE(excluded.stats_b, stats_b),
                    attributes_a = excluded.attributes_a,
                    attributes_b = excluded.attributes_b
                "#
            ),
            params![
                record.event,
                record.date.format("%Y-%m-%d").to_string(),
                record.location,
                record.fighter_a,
                record.fighter_b,
                record.outcome.code(),
                record.method,
                record.ending_round,
                record.ending_time_sec,
                record.time_format,
                record.weight_class,
                record.referee,
                stats_a,
                stats_b,
                attributes_a,
                attributes_b,
            ],
        )?;
        Ok(())
    }

    /// Insert multiple fight records in one transaction
    pub fn upsert_fights(&self, records: &[FightRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.upsert_fight(record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// All fights in insertion order
    pub fn get_all_fights(&self) -> Result<Vec<FightRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FIGHT_COLUMNS} FROM fights ORDER BY id"))?;
        let fights = stmt
            .query_map([], Self::row_to_fight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fights)
    }

    /// Fights a competitor took part in, by date then insertion order
    pub fn get_competitor_fights(&self, name: &str) -> Result<Vec<FightRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FIGHT_COLUMNS} FROM fights
             WHERE fighter_a = ?1 OR fighter_b = ?1
             ORDER BY date, id"
        ))?;
        let fights = stmt
            .query_map(params![name], Self::row_to_fight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fights)
    }

    /// Distinct competitor names seen in any fight, sorted
    pub fn get_competitor_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT fighter_a FROM fights UNION SELECT fighter_b FROM fights ORDER BY 1",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn row_to_fight(row: &rusqlite::Row) -> rusqlite::Result<FightRecord> {
        fn json<T: serde::de::DeserializeOwned>(
            idx: usize,
            text: &str,
        ) -> rusqlite::Result<T> {
            serde_json::from_str(text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        }

        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let outcome: String = row.get(5)?;
        let stats_a: Option<String> = row.get(12)?;
        let stats_b: Option<String> = row.get(13)?;
        let attributes_a: String = row.get(14)?;
        let attributes_b: String = row.get(15)?;

        Ok(FightRecord {
            event: row.get(0)?,
            date,
            location: row.get(2)?,
            fighter_a: row.get(3)?,
            fighter_b: row.get(4)?,
            outcome: Outcome::from_code(&outcome),
            method: row.get(6)?,
            ending_round: row.get(7)?,
            ending_time_sec: row.get(8)?,
            time_format: row.get(9)?,
            weight_class: row.get(10)?,
            referee: row.get(11)?,
            stats_a: stats_a.map(|s| json(12, &s)).transpose()?,
            stats_b: stats_b.map(|s| json(13, &s)).transpose()?,
            attributes_a: json(14, &attributes_a)?,
            attributes_b: json(15, &attributes_b)?,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let fighter_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fighters", [], |row| row.get(0))?;

        let fight_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fights", [], |row| row.get(0))?;

        let (min_date, max_date): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM fights",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DatabaseStats {
            fighter_count: fighter_count as usize,
            fight_count: fight_count as usize,
            earliest_fight: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_fight: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }

    /// Remove all fights and competitor records
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM fights; DELETE FROM fighters;")
            .map_err(FightError::from)
    }

    /// Replace the stored history with a fresh import, atomically
    pub fn replace_all(
        &self,
        profiles: &[CompetitorProfile],
        records: &[FightRecord],
    ) -> Result<(usize, usize)> {
        let tx = self.conn.unchecked_transaction()?;
        self.clear()?;
        for profile in profiles {
            self.upsert_fighter(profile)?;
        }
        for record in records {
            self.upsert_fight(record)?;
        }
        tx.commit()?;
        Ok((profiles.len(), records.len()))
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub fighter_count: usize,
    pub fight_count: usize,
    pub earliest_fight: Option<NaiveDate>,
    pub latest_fight: Option<NaiveDate>,
}
