use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const DB_FILE: &str = "coursebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            course_id TEXT PRIMARY KEY,
            headers TEXT,
            metadata TEXT,
            updated_at TEXT
        )",
        [],
    )?;

    // One row per student per course; `data` is the row's JSON cell bag.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_course ON students(course_id, position)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS named_tables(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT 'Untitled Table',
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Stored roster for one course, resolved from whichever shape is on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRoster {
    Missing,
    /// Student rows with no course record (rows saved before headers were
    /// tracked). Headers have to be derived from the rows themselves.
    Legacy(Vec<Map<String, Value>>),
    Structured {
        headers: Vec<String>,
        rows: Vec<Map<String, Value>>,
        metadata: Option<Value>,
    },
}

impl StoredRoster {
    pub fn into_parts(self) -> (Vec<String>, Vec<Map<String, Value>>, Option<Value>) {
        match self {
            StoredRoster::Missing => (Vec::new(), Vec::new(), None),
            StoredRoster::Legacy(rows) => (headers_from_rows(&rows), rows, None),
            StoredRoster::Structured {
                headers,
                rows,
                metadata,
            } => {
                if headers.is_empty() {
                    (headers_from_rows(&rows), rows, metadata)
                } else {
                    (headers, rows, metadata)
                }
            }
        }
    }
}

pub fn headers_from_rows(rows: &[Map<String, Value>]) -> Vec<String> {
    rows.first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

/// Lays a row out in header order. Header keys the row lacks become `""`;
/// keys outside the header list are kept after the header columns.
fn conform_row(row: &Map<String, Value>, headers: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for h in headers {
        let v = row.get(h).cloned().unwrap_or_else(|| Value::String(String::new()));
        out.insert(h.clone(), v);
    }
    for (k, v) in row {
        if !out.contains_key(k) {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

/// Describes why a caller-supplied header list cannot be stored: a blank
/// name, or two names equal after trimming.
pub fn header_problem(headers: &[String]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    for (i, h) in headers.iter().enumerate() {
        let name = h.trim();
        if name.is_empty() {
            return Some(format!("headers[{}] is blank", i));
        }
        if !seen.insert(name) {
            return Some(format!("duplicate header {:?}", name));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub rows_written: usize,
    pub rows_replaced: usize,
}

/// Replaces the whole roster for `course_id` and upserts its course record.
///
/// `headers: None` derives the list from the first row; `metadata: None`
/// keeps whatever metadata was stored before.
pub fn save_roster(
    conn: &Connection,
    course_id: &str,
    rows: &[Map<String, Value>],
    headers: Option<&[String]>,
    metadata: Option<&Value>,
) -> anyhow::Result<SaveSummary> {
    let headers: Vec<String> = match headers {
        Some(h) => h.to_vec(),
        None => headers_from_rows(rows),
    };
    if let Some(problem) = header_problem(&headers) {
        anyhow::bail!("invalid header list: {}", problem);
    }
    let headers_json = serde_json::to_string(&headers)?;
    let metadata_json = metadata.map(serde_json::to_string).transpose()?;

    let tx = conn
        .unchecked_transaction()
        .context("failed to start roster transaction")?;

    let rows_replaced = tx
        .execute("DELETE FROM students WHERE course_id = ?", [course_id])
        .context("failed to clear previous roster")?;

    {
        let mut insert = tx.prepare(
            "INSERT INTO students(course_id, position, data) VALUES(?, ?, ?)",
        )?;
        for (i, row) in rows.iter().enumerate() {
            let data = serde_json::to_string(&conform_row(row, &headers))?;
            insert
                .execute((course_id, i as i64, data))
                .with_context(|| format!("failed to insert roster row {}", i))?;
        }
    }

    tx.execute(
        "INSERT INTO courses(course_id, headers, metadata, updated_at)
         VALUES(?1, ?2, ?3, ?4)
         ON CONFLICT(course_id) DO UPDATE SET
           headers = excluded.headers,
           metadata = COALESCE(excluded.metadata, courses.metadata),
           updated_at = excluded.updated_at",
        (course_id, &headers_json, &metadata_json, now_stamp()),
    )
    .context("failed to upsert course record")?;

    tx.commit().context("failed to commit roster")?;

    Ok(SaveSummary {
        rows_written: rows.len(),
        rows_replaced,
    })
}

pub fn load_roster(conn: &Connection, course_id: &str) -> anyhow::Result<StoredRoster> {
    let mut stmt = conn.prepare(
        "SELECT data FROM students WHERE course_id = ? ORDER BY position, id",
    )?;
    let rows = stmt
        .query_map([course_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|text| parse_row(&text))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let course: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT headers, metadata FROM courses WHERE course_id = ?",
            [course_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let Some((headers_json, metadata_json)) = course else {
        if rows.is_empty() {
            return Ok(StoredRoster::Missing);
        }
        return Ok(StoredRoster::Legacy(rows));
    };

    let headers: Vec<String> = match headers_json.as_deref() {
        Some(t) => serde_json::from_str(t).context("stored headers are invalid JSON")?,
        None => Vec::new(),
    };
    let metadata: Option<Value> = match metadata_json.as_deref() {
        Some(t) => Some(serde_json::from_str(t).context("stored metadata is invalid JSON")?),
        None => None,
    };

    if headers.is_empty() && metadata.is_none() {
        if rows.is_empty() {
            return Ok(StoredRoster::Missing);
        }
        return Ok(StoredRoster::Legacy(rows));
    }

    Ok(StoredRoster::Structured {
        headers,
        rows,
        metadata,
    })
}

fn parse_row(text: &str) -> anyhow::Result<Map<String, Value>> {
    // Rows written as bare arrays by very old clients are keyed positionally.
    match serde_json::from_str::<Value>(text).context("stored row is invalid JSON")? {
        Value::Object(m) => Ok(m),
        Value::Array(cells) => Ok(cells
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("Column {}", i + 1), v))
            .collect()),
        other => anyhow::bail!("stored row is not an object: {}", other),
    }
}

pub fn list_courses(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT course_id FROM students ORDER BY course_id",
    )?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Removes every roster row and the course record. Returns the number of
/// roster rows deleted.
pub fn delete_course(conn: &Connection, course_id: &str) -> anyhow::Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start delete transaction")?;
    let removed = tx.execute("DELETE FROM students WHERE course_id = ?", [course_id])?;
    tx.execute("DELETE FROM courses WHERE course_id = ?", [course_id])?;
    tx.commit().context("failed to commit course delete")?;
    Ok(removed)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamedTable {
    pub id: i64,
    pub name: String,
    pub data: Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamedTableSummary {
    pub id: i64,
    pub name: String,
    pub updated_at: String,
}

/// Updates table `id` when it exists, otherwise creates a new one. A blank
/// name keeps the stored name on update and falls back to the column
/// default on insert.
pub fn save_table(
    conn: &Connection,
    id: Option<i64>,
    name: Option<&str>,
    data: &Value,
) -> anyhow::Result<NamedTable> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let data_json = serde_json::to_string(data)?;
    let stamp = now_stamp();

    if let Some(id) = id {
        let updated = conn.execute(
            "UPDATE named_tables
             SET name = COALESCE(?2, name), data = ?3, updated_at = ?4
             WHERE id = ?1",
            (id, name, &data_json, &stamp),
        )?;
        if updated > 0 {
            return get_table(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("table {} vanished after update", id));
        }
    }

    conn.execute(
        "INSERT INTO named_tables(name, data, created_at, updated_at)
         VALUES(COALESCE(?1, 'Untitled Table'), ?2, ?3, ?3)",
        (name, &data_json, &stamp),
    )
    .context("failed to insert table")?;
    let new_id = conn.last_insert_rowid();
    get_table(conn, new_id)?.ok_or_else(|| anyhow::anyhow!("table {} missing after insert", new_id))
}

pub fn get_table(conn: &Connection, id: i64) -> anyhow::Result<Option<NamedTable>> {
    let row: Option<(i64, String, String, String, String)> = conn
        .query_row(
            "SELECT id, name, data, created_at, updated_at FROM named_tables WHERE id = ?",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .optional()?;
    let Some((id, name, data, created_at, updated_at)) = row else {
        return Ok(None);
    };
    Ok(Some(NamedTable {
        id,
        name,
        data: serde_json::from_str(&data).context("stored table data is invalid JSON")?,
        created_at,
        updated_at,
    }))
}

pub fn list_tables(conn: &Connection) -> anyhow::Result<Vec<NamedTableSummary>> {
    let mut stmt = conn.prepare("SELECT id, name, updated_at FROM named_tables ORDER BY id")?;
    let tables = stmt
        .query_map([], |r| {
            Ok(NamedTableSummary {
                id: r.get(0)?,
                name: r.get(1)?,
                updated_at: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tables)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<Value>> {
    let text: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match text {
        Some(t) => Ok(Some(
            serde_json::from_str(&t).with_context(|| format!("setting {} is invalid JSON", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}
