use serde::Serialize;
use serde_json::{Map, Value};

const ROLL_HINTS: [&str; 4] = ["roll", "prn", "usn", "reg"];
const NAME_HINTS: [&str; 2] = ["name", "student"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub roll_number: String,
    pub name: String,
}

impl DisplayInfo {
    fn placeholder() -> Self {
        DisplayInfo {
            roll_number: "-".into(),
            name: "-".into(),
        }
    }
}

/// Best-effort roll number / name pick for one roster row, using the row's
/// own key order. Presentation only; never use the result as a key.
pub fn infer_roles(row: &Value) -> DisplayInfo {
    let Some(obj) = row.as_object() else {
        return DisplayInfo::placeholder();
    };
    let keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
    pick(&keys, row)
}

/// Same heuristic, but over an explicit header list so the result does not
/// depend on how the row object happens to be ordered.
pub fn infer_roles_with_headers(row: &Value, headers: &[String]) -> DisplayInfo {
    if headers.is_empty() {
        return infer_roles(row);
    }
    if row.as_object().map_or(true, Map::is_empty) {
        return DisplayInfo::placeholder();
    }
    let keys: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
    pick(&keys, row)
}

fn pick(keys: &[&str], row: &Value) -> DisplayInfo {
    if keys.is_empty() {
        return DisplayInfo::placeholder();
    }
    let (roll, name) = role_indices(keys);
    DisplayInfo {
        roll_number: display_value(row.get(keys[roll])),
        name: display_value(row.get(keys[name])),
    }
}

/// Returns `(roll_index, name_index)` for a non-empty key list.
pub fn role_indices(keys: &[&str]) -> (usize, usize) {
    let lowered: Vec<String> = keys.iter().map(|k| k.trim().to_lowercase()).collect();

    let roll = lowered
        .iter()
        .position(|k| ROLL_HINTS.iter().any(|h| k.contains(h)) || k == "id")
        .unwrap_or(0);

    let mut name = lowered
        .iter()
        .position(|k| NAME_HINTS.iter().any(|h| k.contains(h)))
        .unwrap_or(if keys.len() > 1 { 1 } else { 0 });

    if roll == name && keys.len() > 1 {
        name = 1;
    }
    (roll, name)
}

fn display_value(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
