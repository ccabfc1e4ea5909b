use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::InterviewRecord;

/// Insert or update a record row. The full record is stored as JSON; the
/// indexed columns mirror the fields used for lookup.
pub fn upsert_interview_record(
    conn: &Connection,
    participant_id: &str,
    record: &InterviewRecord,
) -> Result<(), DatabaseError> {
    let data = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO interview_records
            (id, participant_id, data, is_complete, role, created_at, updated_at, ended_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            is_complete = excluded.is_complete,
            role = excluded.role,
            updated_at = excluded.updated_at,
            ended_at = excluded.ended_at",
        params![
            record.id.to_string(),
            participant_id,
            data,
            record.is_complete as i32,
            record.role.map(|r| r.as_str()),
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
            record.ended_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

/// Most recently updated record for the participant that has not been closed.
pub fn get_active_interview_record(
    conn: &Connection,
    participant_id: &str,
) -> Result<Option<InterviewRecord>, DatabaseError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM interview_records
             WHERE participant_id = ?1 AND ended_at IS NULL
             ORDER BY updated_at DESC
             LIMIT 1",
            params![participant_id],
            |row| row.get(0),
        )
        .optional()?;

    match data {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// All records for a participant, oldest first.
pub fn list_interview_records(
    conn: &Connection,
    participant_id: &str,
) -> Result<Vec<InterviewRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT data FROM interview_records
         WHERE participant_id = ?1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![participant_id], |row| row.get::<_, String>(0))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(serde_json::from_str(&row?)?);
    }
    Ok(records)
}
