//! Passage store backed by SQLite
//!
//! Per meeting it keeps the ordered chunk texts (JSON array of strings on the
//! `meetings` row) and the embedding matrix (one BLOB row in
//! `meeting_embeddings`). Position `i` in the chunk array is row `i` of the
//! matrix. The store also carries the meeting transcript, summary and chat
//! log.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use super::embedding::{EmbeddingMatrix, EmbeddingWriter};
use super::error::Result;
use crate::core::meeting::{ChatEntry, MeetingId, MeetingRecord};

/// Stored passage record for a meeting.
#[derive(Debug, Clone, PartialEq)]
pub enum Passages {
    Valid(Vec<String>),
    /// The stored value is not a JSON array of strings.
    Malformed,
}

/// Result of [`PassageStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored { rows: usize },
    /// Nothing usable after filtering; the store was left untouched.
    Skipped,
}

/// Index statistics
#[derive(Debug)]
pub struct StoreStats {
    pub meeting_count: usize,
    pub embedded_count: usize,
    pub chat_count: usize,
    pub last_created: Option<i64>,
}

pub struct PassageStore {
    conn: Connection,
}

impl PassageStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meetings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transcript TEXT NOT NULL,
                summary TEXT,
                transcript_chunks TEXT,  -- JSON array of passage strings
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meeting_embeddings (
                meeting_id INTEGER PRIMARY KEY,
                embedding BLOB NOT NULL,
                row_count INTEGER NOT NULL,
                dim INTEGER NOT NULL,
                FOREIGN KEY (meeting_id) REFERENCES meetings(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id INTEGER NOT NULL,
                user_message TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (meeting_id) REFERENCES meetings(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_chat_meeting ON chat_history(meeting_id);
            "#,
        )?;

        Ok(())
    }

    // ===== Passages and embeddings =====

    /// Embed and persist the usable chunks of a meeting.
    ///
    /// Empty and whitespace-only chunks are dropped first. If none remain the
    /// call is a logged no-op. Otherwise the passage array and the embedding
    /// matrix are replaced together in one transaction, creating the meeting
    /// row if needed. An embedding failure propagates and nothing is written.
    pub fn put<S: AsRef<str>>(
        &mut self,
        writer: &EmbeddingWriter,
        meeting_id: MeetingId,
        chunks: &[S],
    ) -> Result<PutOutcome> {
        let chunks = filter_chunks(chunks.iter().map(AsRef::as_ref));
        self.put_filtered(writer, meeting_id, chunks)
    }

    /// Like [`put`](Self::put) for chunk lists decoded from JSON. Non-string
    /// elements are dropped; a value that is not an array is a no-op.
    pub fn put_json(
        &mut self,
        writer: &EmbeddingWriter,
        meeting_id: MeetingId,
        chunks: &serde_json::Value,
    ) -> Result<PutOutcome> {
        let Some(items) = chunks.as_array() else {
            warn!(%meeting_id, "summary chunks are not a list, nothing stored");
            return Ok(PutOutcome::Skipped);
        };
        let chunks = filter_chunks(items.iter().filter_map(serde_json::Value::as_str));
        self.put_filtered(writer, meeting_id, chunks)
    }

    fn put_filtered(
        &mut self,
        writer: &EmbeddingWriter,
        meeting_id: MeetingId,
        chunks: Vec<String>,
    ) -> Result<PutOutcome> {
        if chunks.is_empty() {
            warn!(%meeting_id, "no valid text in summary chunks, nothing stored");
            return Ok(PutOutcome::Skipped);
        }

        let matrix = writer.embed(&chunks)?;
        let chunks_json = serde_json::to_string(&chunks)?;
        let blob = matrix.to_blob();
        let now = chrono::Utc::now().timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO meetings (id, transcript, created_at) VALUES (?1, '', ?2)",
            params![meeting_id.0, now],
        )?;
        tx.execute(
            "UPDATE meetings SET transcript_chunks = ?1 WHERE id = ?2",
            params![chunks_json, meeting_id.0],
        )?;
        tx.execute(
            r#"
            INSERT INTO meeting_embeddings (meeting_id, embedding, row_count, dim)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(meeting_id) DO UPDATE SET
                embedding = excluded.embedding,
                row_count = excluded.row_count,
                dim = excluded.dim
            "#,
            params![meeting_id.0, blob, matrix.rows() as i64, matrix.dim() as i64],
        )?;
        tx.commit()?;

        info!(%meeting_id, rows = matrix.rows(), dim = matrix.dim(), "stored embeddings");
        Ok(PutOutcome::Stored { rows: matrix.rows() })
    }

    /// Replace only the passage array of a meeting. Returns false when the
    /// meeting does not exist.
    pub fn replace_passages<S: AsRef<str>>(
        &self,
        meeting_id: MeetingId,
        passages: &[S],
    ) -> Result<bool> {
        let items: Vec<&str> = passages.iter().map(AsRef::as_ref).collect();
        let json = serde_json::to_string(&items)?;
        self.replace_passages_raw(meeting_id, &json)
    }

    /// Store a raw passage value without checking its shape.
    pub fn replace_passages_raw(&self, meeting_id: MeetingId, json: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE meetings SET transcript_chunks = ?1 WHERE id = ?2",
            params![json, meeting_id.0],
        )?;
        Ok(updated > 0)
    }

    /// Replace only the embedding matrix of a meeting, atomically.
    pub fn replace_embeddings(&self, meeting_id: MeetingId, matrix: &EmbeddingMatrix) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO meeting_embeddings (meeting_id, embedding, row_count, dim)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(meeting_id) DO UPDATE SET
                embedding = excluded.embedding,
                row_count = excluded.row_count,
                dim = excluded.dim
            "#,
            params![
                meeting_id.0,
                matrix.to_blob(),
                matrix.rows() as i64,
                matrix.dim() as i64
            ],
        )?;
        Ok(())
    }

    /// Stored embedding matrix, or `None` when the meeting has none.
    pub fn get_embeddings(&self, meeting_id: MeetingId) -> Result<Option<EmbeddingMatrix>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM meeting_embeddings WHERE meeting_id = ?1",
                params![meeting_id.0],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(blob) => Ok(Some(EmbeddingMatrix::from_blob(&blob)?)),
            None => {
                debug!(%meeting_id, "no embeddings found");
                Ok(None)
            }
        }
    }

    /// Stored passages in original order, or `None` when the meeting has no
    /// chunk record.
    pub fn get_passages(&self, meeting_id: MeetingId) -> Result<Option<Passages>> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT transcript_chunks FROM meetings WHERE id = ?1",
                params![meeting_id.0],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw.flatten() else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(passages) => Ok(Some(Passages::Valid(passages))),
            Err(e) => {
                warn!(%meeting_id, error = %e, "stored passages are not a list of strings");
                Ok(Some(Passages::Malformed))
            }
        }
    }

    // ===== Meetings =====

    /// Insert a new meeting with its raw transcript.
    pub fn save_transcript(&self, transcript: &str) -> Result<MeetingId> {
        let now = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO meetings (transcript, created_at) VALUES (?1, ?2)",
            params![transcript, now],
        )?;
        Ok(MeetingId(self.conn.last_insert_rowid()))
    }

    /// Attach a summary. Returns false when the meeting does not exist.
    /// Replace the transcript of an existing meeting. `false` if it does not exist.
    pub fn update_transcript(&self, meeting_id: MeetingId, transcript: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE meetings SET transcript = ?1 WHERE id = ?2",
            params![transcript, meeting_id.0],
        )?;
        Ok(updated > 0)
    }

    pub fn save_summary(&self, meeting_id: MeetingId, summary: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE meetings SET summary = ?1 WHERE id = ?2",
            params![summary, meeting_id.0],
        )?;
        Ok(updated > 0)
    }

    pub fn list_meetings(&self) -> Result<Vec<MeetingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, transcript, summary, created_at FROM meetings ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], map_meeting)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get_meeting(&self, meeting_id: MeetingId) -> Result<Option<MeetingRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, transcript, summary, created_at FROM meetings WHERE id = ?1",
                params![meeting_id.0],
                map_meeting,
            )
            .optional()?;
        Ok(record)
    }

    /// Delete a meeting and, by cascade, its embeddings and chat log.
    pub fn delete_meeting(&self, meeting_id: MeetingId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM meetings WHERE id = ?1", params![meeting_id.0])?;
        if deleted > 0 {
            info!(%meeting_id, "deleted meeting and related data");
        }
        Ok(deleted > 0)
    }

    // ===== Chat log =====

    /// Record an exchange. Skipped (false) when the meeting does not exist.
    pub fn save_chat(&self, meeting_id: MeetingId, user: &str, bot: &str) -> Result<bool> {
        if self.get_meeting(meeting_id)?.is_none() {
            warn!(%meeting_id, "meeting does not exist, chat not saved");
            return Ok(false);
        }
        let now = chrono::Utc::now().timestamp();
        self.conn.execute(
            r#"
            INSERT INTO chat_history (meeting_id, user_message, bot_response, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![meeting_id.0, user, bot, now],
        )?;
        Ok(true)
    }

    /// Chat log of a meeting, oldest first.
    pub fn chat_history(&self, meeting_id: MeetingId) -> Result<Vec<ChatEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_message, bot_response, created_at FROM chat_history
            WHERE meeting_id = ?1 ORDER BY created_at ASC, id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![meeting_id.0], |row| {
            Ok(ChatEntry {
                user: row.get(0)?,
                bot: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let last_created: Option<i64> = self
            .conn
            .query_row("SELECT MAX(created_at) FROM meetings", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(StoreStats {
            meeting_count: count("SELECT COUNT(*) FROM meetings")?,
            embedded_count: count("SELECT COUNT(*) FROM meeting_embeddings")?,
            chat_count: count("SELECT COUNT(*) FROM chat_history")?,
            last_created,
        })
    }
}

fn map_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRecord> {
    Ok(MeetingRecord {
        id: MeetingId(row.get(0)?),
        transcript: row.get(1)?,
        summary: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Keep chunks with visible text, in order.
pub fn filter_chunks<'a, I>(chunks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    chunks
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::search::embedding::testing::{FailingEmbedder, FakeEmbedder};
    use crate::search::error::Error;

    fn writer() -> EmbeddingWriter {
        EmbeddingWriter::new(Arc::new(FakeEmbedder::new(vec![0.5, 0.5])), 16)
    }

    #[test]
    fn test_empty_chunks_filtered() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let outcome = store.put(&writer(), MeetingId(1), &["", "  ", "valid text"])?;
        assert_eq!(outcome, PutOutcome::Stored { rows: 1 });

        let matrix = store.get_embeddings(MeetingId(1))?.unwrap();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(
            store.get_passages(MeetingId(1))?,
            Some(Passages::Valid(vec!["valid text".to_string()]))
        );
        Ok(())
    }

    #[test]
    fn test_all_blank_is_noop() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let outcome = store.put(&writer(), MeetingId(3), &["", "\n\t"])?;
        assert_eq!(outcome, PutOutcome::Skipped);
        assert!(store.get_embeddings(MeetingId(3))?.is_none());
        assert!(store.get_meeting(MeetingId(3))?.is_none());
        Ok(())
    }

    #[test]
    fn test_put_json_drops_non_strings() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let chunks = serde_json::json!(["first", 42, null, " ", {"a": 1}, "second"]);
        let outcome = store.put_json(&writer(), MeetingId(5), &chunks)?;
        assert_eq!(outcome, PutOutcome::Stored { rows: 2 });

        let not_a_list = serde_json::json!({"chunks": ["x"]});
        assert_eq!(store.put_json(&writer(), MeetingId(6), &not_a_list)?, PutOutcome::Skipped);
        Ok(())
    }

    #[test]
    fn test_overwrite_replaces_matrix() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        store.put(&writer(), MeetingId(2), &["a", "b", "c"])?;
        store.put(&writer(), MeetingId(2), &["only"])?;

        assert_eq!(store.get_embeddings(MeetingId(2))?.unwrap().rows(), 1);
        assert_eq!(
            store.get_passages(MeetingId(2))?,
            Some(Passages::Valid(vec!["only".to_string()]))
        );
        Ok(())
    }

    #[test]
    fn test_embedding_failure_writes_nothing() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let failing = EmbeddingWriter::new(Arc::new(FailingEmbedder), 4);
        let err = store.put(&failing, MeetingId(9), &["text"]).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(store.get_embeddings(MeetingId(9))?.is_none());
        assert!(store.get_passages(MeetingId(9))?.is_none());
        Ok(())
    }

    #[test]
    fn test_absent_vs_empty() -> Result<()> {
        let store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("SPEAKER_00: hello")?;
        // meeting exists but has no chunk record yet
        assert!(store.get_passages(id)?.is_none());
        assert!(store.get_embeddings(id)?.is_none());

        store.replace_passages::<&str>(id, &[])?;
        assert_eq!(store.get_passages(id)?, Some(Passages::Valid(vec![])));
        Ok(())
    }

    #[test]
    fn test_malformed_passages() -> Result<()> {
        let store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("t")?;
        store.replace_passages_raw(id, r#"{"not": "a list"}"#)?;
        assert_eq!(store.get_passages(id)?, Some(Passages::Malformed));

        store.replace_passages_raw(id, "[1, 2, 3]")?;
        assert_eq!(store.get_passages(id)?, Some(Passages::Malformed));
        Ok(())
    }

    #[test]
    fn test_meetings_and_cascade() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("SPEAKER_00: kickoff")?;
        assert!(store.save_summary(id, "Kickoff meeting")?);
        assert!(!store.save_summary(MeetingId(404), "nope")?);

        store.put(&writer(), id, &["kickoff agenda"])?;
        assert!(store.save_chat(id, "what was discussed?", "the agenda")?);
        assert!(!store.save_chat(MeetingId(404), "q", "a")?);

        let meetings = store.list_meetings()?;
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].summary.as_deref(), Some("Kickoff meeting"));
        assert_eq!(meetings[0].name(), format!("Meeting {}", id));

        assert!(store.delete_meeting(id)?);
        assert!(store.get_meeting(id)?.is_none());
        assert!(store.get_embeddings(id)?.is_none());
        assert!(store.chat_history(id)?.is_empty());
        assert!(!store.delete_meeting(id)?);
        Ok(())
    }

    #[test]
    fn test_update_transcript() -> Result<()> {
        let store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("SPEAKER_00: draft")?;
        assert!(store.update_transcript(id, "SPEAKER_00: final")?);
        assert_eq!(store.get_meeting(id)?.map(|m| m.transcript).as_deref(), Some("SPEAKER_00: final"));
        assert!(!store.update_transcript(MeetingId(404), "nobody")?);
        Ok(())
    }

    #[test]
    fn test_chat_history_order() -> Result<()> {
        let store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("t")?;
        store.save_chat(id, "first", "one")?;
        store.save_chat(id, "second", "two")?;

        let history = store.chat_history(id)?;
        let users: Vec<_> = history.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["first", "second"]);
        Ok(())
    }

    #[test]
    fn test_stats() -> Result<()> {
        let mut store = PassageStore::open_in_memory()?;
        let id = store.save_transcript("t")?;
        store.save_transcript("u")?;
        store.put(&writer(), id, &["x"])?;
        store.save_chat(id, "q", "a")?;

        let stats = store.stats()?;
        assert_eq!(stats.meeting_count, 2);
        assert_eq!(stats.embedded_count, 1);
        assert_eq!(stats.chat_count, 1);
        assert!(stats.last_created.is_some());
        Ok(())
    }
}
