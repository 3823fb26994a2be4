//! SQLite-based study session storage and statistics.
//!
//! Backs the local session recorder and the `stats`/`sessions` commands.

use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use rusqlite::{params, types::Type, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError};
use crate::recorder::{NewStudySession, StudySessionRecord};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_focus_secs: u64,
    pub today_sessions: u64,
    pub today_focus_secs: u64,
    pub goals_achieved: u64,
    /// Mean self-reported focus level, 0.0 when there are no sessions.
    pub average_focus_level: f64,
}

/// SQLite database for completed focus sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/studdyhub/studdyhub.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studdyhub.db");
        Ok(Self::open_at(&path)?)
    }

    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert one completed focus session. `created_at` is assigned here.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_study_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, DatabaseError> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO study_sessions (duration, focus_level, distractions, goal_achieved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.duration_secs,
                session.focus_level,
                session.distractions,
                session.goal_achieved,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(StudySessionRecord {
            id: self.conn.last_insert_rowid().to_string(),
            duration_secs: session.duration_secs,
            focus_level: session.focus_level,
            distractions: session.distractions,
            goal_achieved: session.goal_achieved,
            created_at,
        })
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored timestamp is malformed.
    pub fn list_study_sessions(
        &self,
        limit: usize,
    ) -> Result<Vec<StudySessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, duration, focus_level, distractions, goal_achieved, created_at
             FROM study_sessions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            let created_at: String = row.get(5)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?
                .with_timezone(&Utc);
            Ok(StudySessionRecord {
                id: row.get::<_, i64>(0)?.to_string(),
                duration_secs: row.get(1)?,
                focus_level: row.get(2)?,
                distractions: row.get(3)?,
                goal_achieved: row.get(4)?,
                created_at,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    pub fn stats_today(&self) -> Result<Stats, DatabaseError> {
        let since = today_start();
        let (count, secs, goals, avg) = self.aggregate(Some(&since))?;
        Ok(Stats {
            total_sessions: count,
            total_focus_secs: secs,
            today_sessions: count,
            today_focus_secs: secs,
            goals_achieved: goals,
            average_focus_level: avg,
        })
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        let (count, secs, goals, avg) = self.aggregate(None)?;
        let (today_count, today_secs, _, _) = self.aggregate(Some(&today_start()))?;
        Ok(Stats {
            total_sessions: count,
            total_focus_secs: secs,
            today_sessions: today_count,
            today_focus_secs: today_secs,
            goals_achieved: goals,
            average_focus_level: avg,
        })
    }

    fn aggregate(&self, since: Option<&str>) -> Result<(u64, u64, u64, f64), DatabaseError> {
        let row = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(duration), 0),
                    COALESCE(SUM(goal_achieved), 0),
                    COALESCE(AVG(focus_level), 0.0)
             FROM study_sessions
             WHERE ?1 IS NULL OR created_at >= ?1",
            params![since],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;
        Ok(row)
    }
}

/// Start of the local calendar day as a stored-timestamp bound.
fn today_start() -> String {
    day_start(&Local::now()).to_rfc3339()
}

/// Midnight of `now`'s day in its own zone, expressed in UTC.
fn day_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map_or_else(|| now.with_timezone(&Utc), |start| start.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::SessionDefaults;

    #[test]
    fn day_starts_at_local_midnight() {
        let tz = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(
            day_start(&now).to_rfc3339(),
            "2026-02-28T22:00:00+00:00"
        );

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        assert_eq!(day_start(&now).to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let record = db
            .record_study_session(&NewStudySession::completed_focus(
                1500,
                SessionDefaults::default(),
            ))
            .unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.duration_secs, 1500);

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_focus_secs, 1500);
        assert_eq!(stats.today_sessions, 1);
        assert!((stats.average_focus_level - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_stats() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.stats_today().unwrap(), Stats::default());
    }

    #[test]
    fn list_newest_first_with_limit() {
        let db = Database::open_memory().unwrap();
        for secs in [600, 900, 1500] {
            db.record_study_session(&NewStudySession::completed_focus(
                secs,
                SessionDefaults::default(),
            ))
            .unwrap();
        }
        let sessions = db.list_study_sessions(2).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].duration_secs, 1500);
        assert_eq!(sessions[1].duration_secs, 900);
    }

    #[test]
    fn goals_counted() {
        let db = Database::open_memory().unwrap();
        let defaults = SessionDefaults {
            goal_achieved: true,
            ..SessionDefaults::default()
        };
        db.record_study_session(&NewStudySession::completed_focus(1500, defaults))
            .unwrap();
        db.record_study_session(&NewStudySession::completed_focus(
            1500,
            SessionDefaults::default(),
        ))
        .unwrap();
        assert_eq!(db.stats_all().unwrap().goals_achieved, 1);
    }
}
