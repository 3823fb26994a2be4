use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{NewStudySession, SessionRecorder, StudySessionRecord};
use crate::error::RecorderError;
use crate::storage::Database;

/// Writes sessions to the local SQLite database.
///
/// rusqlite is blocking, so each insert runs on the blocking pool.
#[derive(Clone)]
pub struct LocalRecorder {
    db: Arc<Mutex<Database>>,
}

impl LocalRecorder {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Shared handle for reading back what was recorded.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }
}

#[async_trait]
impl SessionRecorder for LocalRecorder {
    fn name(&self) -> &str {
        "local"
    }

    async fn record_focus_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, RecorderError> {
        let db = Arc::clone(&self.db);
        let session = session.clone();
        tokio::task::spawn_blocking(move || -> Result<StudySessionRecord, RecorderError> {
            let db = db
                .lock()
                .map_err(|_| RecorderError::Worker("database mutex poisoned".into()))?;
            Ok(db.record_study_session(&session)?)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::SessionDefaults;

    #[tokio::test]
    async fn records_into_sqlite() {
        let recorder = LocalRecorder::new(Database::open_memory().unwrap());
        let session = NewStudySession::completed_focus(1500, SessionDefaults::default());

        let record = recorder.record_focus_session(&session).await.unwrap();
        assert_eq!(record.duration_secs, 1500);

        let db = recorder.database();
        let stats = db.lock().unwrap().stats_all().unwrap();
        assert_eq!(stats.total_sessions, 1);
    }
}
