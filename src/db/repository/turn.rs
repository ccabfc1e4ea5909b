use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::TurnRole;
use crate::models::Turn;

/// Append turns to a record's conversation log, in order.
pub fn insert_turns(
    conn: &Connection,
    participant_id: &str,
    record_id: &Uuid,
    turns: &[Turn],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO interview_turns (record_id, participant_id, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for turn in turns {
        stmt.execute(params![
            record_id.to_string(),
            participant_id,
            turn.role.as_str(),
            turn.content,
            turn.timestamp,
        ])?;
    }
    Ok(())
}

/// The last `limit` turns of a record, oldest first.
pub fn get_recent_turns(
    conn: &Connection,
    record_id: &Uuid,
    limit: usize,
) -> Result<Vec<Turn>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT role, content, created_at FROM (
             SELECT id, role, content, created_at FROM interview_turns
             WHERE record_id = ?1
             ORDER BY id DESC
             LIMIT ?2
         ) ORDER BY id ASC",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![record_id.to_string(), limit], |row| {
        Ok(TurnRow {
            role: row.get(0)?,
            content: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;

    let mut turns = Vec::new();
    for row in rows {
        turns.push(turn_from_row(row?)?);
    }
    Ok(turns)
}

/// Remove a record's whole conversation log. Returns the number of turns deleted.
pub fn delete_turns(conn: &Connection, record_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM interview_turns WHERE record_id = ?1",
        params![record_id.to_string()],
    )?;
    Ok(deleted)
}

struct TurnRow {
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

fn turn_from_row(row: TurnRow) -> Result<Turn, DatabaseError> {
    Ok(Turn {
        role: TurnRole::from_str(&row.role)?,
        content: row.content,
        timestamp: row.created_at,
    })
}
