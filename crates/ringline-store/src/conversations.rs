//! Conversation and message history.

use crate::{format_timestamp, new_id, StoreError};
use chrono::{DateTime, Utc};
use ringline_types::ConversationSummary;
use rusqlite::{params, Connection};

/// One line of a call transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// `"caller"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Persists a transcript as a new voice conversation.
///
/// All rows are written in one transaction. Returns the conversation id, or
/// `None` when the transcript is empty.
pub fn record_transcript(
    conn: &Connection,
    business_id: &str,
    contact_id: Option<&str>,
    lines: &[TranscriptLine],
) -> Result<Option<String>, StoreError> {
    let Some(last) = lines.last() else {
        return Ok(None);
    };

    let id = new_id();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO conversations (id, business_id, contact_id, channel, created_at, last_message_at)
         VALUES (?1, ?2, ?3, 'voice', ?4, ?5)",
        params![
            id,
            business_id,
            contact_id,
            format_timestamp(lines[0].at),
            format_timestamp(last.at),
        ],
    )?;
    for line in lines {
        tx.execute(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![new_id(), id, line.role, line.content, format_timestamp(line.at)],
        )?;
    }
    tx.commit()?;
    tracing::debug!(conversation_id = %id, messages = lines.len(), "transcript recorded");
    Ok(Some(id))
}

/// Most recent conversations for a contact with their final message text.
pub fn recent_for_contact(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
    limit: usize,
) -> Result<Vec<ConversationSummary>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(c.last_message_at, c.created_at),
                (SELECT m.content FROM messages m
                 WHERE m.conversation_id = c.id
                 ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1)
         FROM conversations c
         WHERE c.business_id = ?1 AND c.contact_id = ?2
         ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![business_id, contact_id, limit as i64], |row| {
        Ok(ConversationSummary {
            timestamp: row.get(0)?,
            last_message: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::create_contact;
    use crate::test_support::migrated_conn;
    use chrono::{Duration, TimeZone};

    fn line(role: &str, content: &str, at: DateTime<Utc>) -> TranscriptLine {
        TranscriptLine {
            role: role.into(),
            content: content.into(),
            at,
        }
    }

    #[test]
    fn empty_transcript_is_not_recorded() {
        let conn = migrated_conn();
        assert_eq!(record_transcript(&conn, "biz-1", None, &[]).unwrap(), None);
    }

    #[test]
    fn summaries_carry_last_message() {
        let conn = migrated_conn();
        let contact = create_contact(&conn, "biz-1", Some("+1555"), None).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap();

        record_transcript(
            &conn,
            "biz-1",
            Some(&contact.id),
            &[line("assistant", "Hi!", t0), line("caller", "Bye.", t0 + Duration::seconds(5))],
        )
        .unwrap();
        record_transcript(
            &conn,
            "biz-1",
            Some(&contact.id),
            &[line("caller", "Second call", t0 + Duration::days(1))],
        )
        .unwrap();

        let recent = recent_for_contact(&conn, "biz-1", &contact.id, 5).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].last_message.as_deref(), Some("Second call"));
        assert_eq!(recent[1].last_message.as_deref(), Some("Bye."));
        assert_eq!(recent[1].timestamp, "2026-10-01T10:00:05Z");
    }
}
