//! Per-document reading progress: cursor, bookmarks, notes.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{parse_datetime, to_u32, Database};
use crate::models::{DocumentId, ReadingProgress};

fn ensure_row(conn: &Connection, document: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO reading_progress (document_id, current_page, total_pages, last_read_at)
         VALUES (?1, 1, 0, ?2)",
        params![document, now.to_rfc3339()],
    )
    .context("failed to create reading_progress row")?;
    Ok(())
}

fn read_bookmarks(conn: &Connection, document: &str) -> Result<BTreeSet<u32>> {
    let mut stmt = conn.prepare(
        "SELECT page FROM bookmarks WHERE document_id = ?1 ORDER BY page ASC",
    )?;
    let mut rows = stmt.query(params![document])?;
    let mut bookmarks = BTreeSet::new();
    while let Some(row) = rows.next()? {
        bookmarks.insert(to_u32(row.get::<_, i64>(0)?, "page")?);
    }
    Ok(bookmarks)
}

fn read_notes(conn: &Connection, document: &str) -> Result<BTreeMap<u32, String>> {
    let mut stmt =
        conn.prepare("SELECT page, body FROM notes WHERE document_id = ?1 ORDER BY page ASC")?;
    let mut rows = stmt.query(params![document])?;
    let mut notes = BTreeMap::new();
    while let Some(row) = rows.next()? {
        notes.insert(to_u32(row.get::<_, i64>(0)?, "page")?, row.get::<_, String>(1)?);
    }
    Ok(notes)
}

impl Database {
    /// Loads the full progress record for `document`, or `None` if the
    /// document has never been opened.
    pub async fn get_progress(&self, document: &DocumentId) -> Result<Option<ReadingProgress>> {
        let key = document.as_str().to_string();
        let id = document.clone();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT current_page, total_pages, last_read_at
                     FROM reading_progress
                     WHERE document_id = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()
                .context("failed to read reading_progress")?;

            let Some((current_page, total_pages, last_read_at)) = row else {
                return Ok(None);
            };

            Ok(Some(ReadingProgress {
                document: id,
                current_page: to_u32(current_page, "current_page")?,
                total_pages: to_u32(total_pages, "total_pages")?,
                last_read_at: parse_datetime(&last_read_at)?,
                bookmarks: read_bookmarks(conn, &key)?,
                notes: read_notes(conn, &key)?,
            }))
        })
        .await
    }

    /// Persists the cursor for `document`. An upsert, so saving the same
    /// page twice produces the same durable state.
    pub async fn save_cursor(
        &self,
        document: &DocumentId,
        page: u32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO reading_progress (document_id, current_page, total_pages, last_read_at)
                 VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(document_id) DO UPDATE SET
                     current_page = excluded.current_page,
                     last_read_at = excluded.last_read_at",
                params![key, i64::from(page), at.to_rfc3339()],
            )
            .context("failed to save reading cursor")?;
            Ok(())
        })
        .await
    }

    /// Returns the last saved page, or `None` for a never-saved document.
    pub async fn load_cursor(&self, document: &DocumentId) -> Result<Option<u32>> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            let page = conn
                .query_row(
                    "SELECT current_page FROM reading_progress WHERE document_id = ?1",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .context("failed to load reading cursor")?;
            page.map(|value| to_u32(value, "current_page")).transpose()
        })
        .await
    }

    /// Records the page count reported on load completion and clamps a
    /// speculatively restored cursor into `[1, total]`. Returns the
    /// (possibly clamped) current page.
    pub async fn set_total_pages(
        &self,
        document: &DocumentId,
        total: u32,
        at: DateTime<Utc>,
    ) -> Result<u32> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            ensure_row(conn, &key, at)?;

            let current: i64 = conn.query_row(
                "SELECT current_page FROM reading_progress WHERE document_id = ?1",
                params![key],
                |row| row.get(0),
            )?;
            let current = to_u32(current, "current_page")?;
            let clamped = if total > 0 { current.clamp(1, total) } else { current };

            conn.execute(
                "UPDATE reading_progress
                 SET total_pages = ?1,
                     current_page = ?2
                 WHERE document_id = ?3",
                params![i64::from(total), i64::from(clamped), key],
            )
            .context("failed to update total pages")?;

            Ok(clamped)
        })
        .await
    }

    /// Inserts or removes a bookmark for `page` and returns the resulting
    /// set, enumerated ascending.
    pub async fn toggle_bookmark(
        &self,
        document: &DocumentId,
        page: u32,
        at: DateTime<Utc>,
    ) -> Result<BTreeSet<u32>> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            ensure_row(conn, &key, at)?;

            let removed = conn
                .execute(
                    "DELETE FROM bookmarks WHERE document_id = ?1 AND page = ?2",
                    params![key, i64::from(page)],
                )
                .context("failed to remove bookmark")?;
            if removed == 0 {
                conn.execute(
                    "INSERT INTO bookmarks (document_id, page) VALUES (?1, ?2)",
                    params![key, i64::from(page)],
                )
                .context("failed to insert bookmark")?;
            }

            read_bookmarks(conn, &key)
        })
        .await
    }

    /// Stores the note for `page`, replacing any existing one.
    pub async fn set_note(
        &self,
        document: &DocumentId,
        page: u32,
        body: String,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            ensure_row(conn, &key, at)?;
            conn.execute(
                "INSERT INTO notes (document_id, page, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT(document_id, page) DO UPDATE SET body = excluded.body",
                params![key, i64::from(page), body],
            )
            .context("failed to store note")?;
            Ok(())
        })
        .await
    }

    pub async fn remove_note(&self, document: &DocumentId, page: u32) -> Result<()> {
        let key = document.as_str().to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM notes WHERE document_id = ?1 AND page = ?2",
                params![key, i64::from(page)],
            )
            .context("failed to remove note")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db(dir: &std::path::Path) -> Database {
        Database::new(dir.join("test.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn cursor_round_trips_and_absent_is_none() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let doc = DocumentId::new("/books/a.pdf");

        assert_eq!(db.load_cursor(&doc).await.unwrap(), None);

        db.save_cursor(&doc, 7, Utc::now()).await.unwrap();
        assert_eq!(db.load_cursor(&doc).await.unwrap(), Some(7));

        // Idempotent: saving the same page twice keeps the same state.
        db.save_cursor(&doc, 7, Utc::now()).await.unwrap();
        assert_eq!(db.load_cursor(&doc).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn set_total_pages_clamps_a_stale_cursor() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let doc = DocumentId::new("/books/b.pdf");

        db.save_cursor(&doc, 40, Utc::now()).await.unwrap();
        let clamped = db.set_total_pages(&doc, 25, Utc::now()).await.unwrap();
        assert_eq!(clamped, 25);
        assert_eq!(db.load_cursor(&doc).await.unwrap(), Some(25));

        let progress = db.get_progress(&doc).await.unwrap().unwrap();
        assert_eq!(progress.total_pages, 25);
    }

    #[tokio::test]
    async fn bookmarks_toggle_and_enumerate_ascending() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let doc = DocumentId::new("/books/c.pdf");
        let now = Utc::now();

        db.toggle_bookmark(&doc, 9, now).await.unwrap();
        db.toggle_bookmark(&doc, 2, now).await.unwrap();
        let marks = db.toggle_bookmark(&doc, 5, now).await.unwrap();
        assert_eq!(marks.iter().copied().collect::<Vec<_>>(), vec![2, 5, 9]);

        // Toggling again removes.
        let marks = db.toggle_bookmark(&doc, 5, now).await.unwrap();
        assert_eq!(marks.iter().copied().collect::<Vec<_>>(), vec![2, 9]);
    }

    #[tokio::test]
    async fn notes_replace_and_remove() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let doc = DocumentId::new("/books/d.pdf");
        let now = Utc::now();

        db.set_note(&doc, 3, "first".into(), now).await.unwrap();
        db.set_note(&doc, 3, "second".into(), now).await.unwrap();
        let progress = db.get_progress(&doc).await.unwrap().unwrap();
        assert_eq!(progress.notes.get(&3).map(String::as_str), Some("second"));

        db.remove_note(&doc, 3).await.unwrap();
        let progress = db.get_progress(&doc).await.unwrap().unwrap();
        assert!(progress.notes.is_empty());
    }
}
