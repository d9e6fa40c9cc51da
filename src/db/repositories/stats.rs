//! Singleton lifetime statistics, folded session by session.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::params;

use crate::db::{parse_date, to_i64, to_u64, Database};
use crate::models::ReadingStats;

impl Database {
    pub async fn get_stats(&self) -> Result<ReadingStats> {
        self.execute(|conn| {
            conn.query_row(
                "SELECT total_pages_read, total_time_spent_secs, average_wpm,
                        last_session_date, sessions_count
                 FROM reading_stats
                 WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .context("failed to read reading_stats")
            .and_then(|(pages, secs, wpm, date, sessions)| {
                Ok(ReadingStats {
                    total_pages_read: to_u64(pages)?,
                    total_time_spent_secs: to_u64(secs)?,
                    average_wpm: wpm,
                    last_session_date: date.as_deref().map(parse_date).transpose()?,
                    sessions_count: to_u64(sessions)?,
                })
            })
        })
        .await
    }

    /// Adds one finished session to the aggregate record in a single
    /// worker task, so concurrent folds cannot interleave their
    /// read-modify-write. Returns the updated record.
    pub async fn fold_session(
        &self,
        pages_read: u32,
        time_spent_secs: u64,
        session_date: NaiveDate,
    ) -> Result<ReadingStats> {
        self.execute(move |conn| {
            let (pages, secs, sessions) = conn
                .query_row(
                    "SELECT total_pages_read, total_time_spent_secs, sessions_count
                     FROM reading_stats
                     WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .context("failed to read reading_stats")?;

            let mut stats = ReadingStats {
                total_pages_read: to_u64(pages)?.saturating_add(u64::from(pages_read)),
                total_time_spent_secs: to_u64(secs)?.saturating_add(time_spent_secs),
                average_wpm: 0.0,
                last_session_date: Some(session_date),
                sessions_count: to_u64(sessions)?.saturating_add(1),
            };
            stats.recompute_average_wpm();

            conn.execute(
                "UPDATE reading_stats
                 SET total_pages_read = ?1,
                     total_time_spent_secs = ?2,
                     average_wpm = ?3,
                     last_session_date = ?4,
                     sessions_count = ?5
                 WHERE id = 1",
                params![
                    to_i64(stats.total_pages_read)?,
                    to_i64(stats.total_time_spent_secs)?,
                    stats.average_wpm,
                    session_date.to_string(),
                    to_i64(stats.sessions_count)?,
                ],
            )
            .context("failed to update reading_stats")?;

            Ok(stats)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stats_start_at_zero() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("stats.sqlite3")).unwrap();

        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats, ReadingStats::default());
    }

    #[tokio::test]
    async fn folding_sessions_accumulates_and_recomputes_speed() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("stats.sqlite3")).unwrap();
        let today = Utc::now().date_naive();

        db.fold_session(4, 300, today).await.unwrap();
        let stats = db.fold_session(2, 300, today).await.unwrap();

        assert_eq!(stats.total_pages_read, 6);
        assert_eq!(stats.total_time_spent_secs, 600);
        assert_eq!(stats.sessions_count, 2);
        assert_eq!(stats.last_session_date, Some(today));
        // 6 pages * 250 words over 10 minutes.
        assert_eq!(stats.average_wpm, 150.0);

        // The durable record matches what the fold returned.
        assert_eq!(db.get_stats().await.unwrap(), stats);
    }
}
