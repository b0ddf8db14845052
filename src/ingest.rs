use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Cursor;

pub type RosterRow = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read workbook: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Roster {
    pub headers: Vec<String>,
    pub rows: Vec<RosterRow>,
}

/// Reads the first worksheet of a workbook held in memory and normalizes it
/// into a header list plus one row object per data row.
///
/// Format is sniffed from the bytes (xlsx, xlsm, xlsb, xls, ods). Any load
/// failure is reported as a single `IngestError::Parse`; nothing partial is
/// returned.
pub fn read_workbook(bytes: &[u8]) -> Result<Roster, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IngestError::Parse(e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(r)) => r,
        Some(Err(e)) => return Err(IngestError::Parse(e.to_string())),
        None => return Err(IngestError::Parse("workbook has no worksheets".into())),
    };

    let grid = range_to_grid(&range);
    let roster = normalize_grid(grid);
    tracing::debug!(
        columns = roster.headers.len(),
        rows = roster.rows.len(),
        "workbook ingested"
    );
    Ok(roster)
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((_, first_col)) = range.start() else {
        return Vec::new();
    };
    // Keep column positions absolute so synthesized names match the sheet.
    let lead = first_col as usize;
    range
        .rows()
        .map(|row| {
            let mut out = vec![String::new(); lead];
            out.extend(row.iter().map(cell_text));
            out
        })
        .collect()
}

/// Flattens one cell to the text a user sees in the sheet.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        // Serials below one carry no date part: a time-of-day cell.
        Data::DateTime(dt) if dt.as_f64() < 1.0 => match dt.as_datetime() {
            Some(ndt) => ndt.format("%H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => {
                ndt.format("%Y-%m-%d").to_string()
            }
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Turns a ragged grid (first row = header candidate) into a rectangular
/// roster.
///
/// Width is the maximum across every row, not just the header row, so a
/// short header never truncates data. Blank headers become `Column <n>`
/// (1-based position) and repeated names get a ` (2)`, ` (3)`... suffix so
/// every column keeps its own key.
pub fn normalize_grid(mut grid: Vec<Vec<String>>) -> Roster {
    if grid.is_empty() {
        return Roster::default();
    }

    let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    for row in grid.iter_mut() {
        row.resize(width, String::new());
    }

    let mut data = grid.split_off(1);
    let header_cells = grid.pop().unwrap_or_default();

    let mut seen: HashSet<String> = HashSet::new();
    let headers: Vec<String> = header_cells
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let base = if raw.trim().is_empty() {
                format!("Column {}", i + 1)
            } else {
                raw.clone()
            };
            unique_header(base, &mut seen)
        })
        .collect();

    let rows = data
        .iter_mut()
        .map(|cells| {
            let mut row = RosterRow::new();
            for (header, cell) in headers.iter().zip(cells.drain(..)) {
                if header.is_empty() {
                    continue;
                }
                row.insert(header.clone(), Value::String(cell));
            }
            row
        })
        .collect();

    Roster { headers, rows }
}

fn unique_header(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.trim().to_string()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", base.trim(), n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
