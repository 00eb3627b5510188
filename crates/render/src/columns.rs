//! Column selection and cell text.

use std::collections::{BTreeSet, HashMap};

use beehive_util::{MISSING, multi_get, truncate_display};
use serde_json::Value;

use crate::{BoolMap, RenderOptions, RenderRequest};

/// Columns whose values are never shortened.
pub const NEVER_TRUNCATE: &[&str] = &["id", "uuid", "parent", "ip_address", "hostname"];
pub const DEFAULT_MAX_COLUMN_WIDTH: usize = 50;

const INFERRED_COLUMNS: usize = 6;
const INFERENCE_SAMPLE: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Column {
    pub header: String,
    pub field: String,
}

impl Column {
    fn same(path: &str) -> Self {
        Self {
            header: path.to_string(),
            field: path.to_string(),
        }
    }

    fn never_truncated(&self) -> bool {
        let leaf = self.field.rsplit('.').next().unwrap_or(&self.field);
        [self.header.as_str(), leaf]
            .iter()
            .any(|name| NEVER_TRUNCATE.contains(&name.to_ascii_lowercase().as_str()))
    }
}

/// Columns from the request, then `--fields`/`--afields`, else inferred.
pub(crate) fn resolve_columns(
    headers: &[String],
    fields: &[String],
    options: &RenderOptions,
    rows: &[&Value],
) -> Vec<Column> {
    let mut columns: Vec<Column> = if !options.fields.is_empty() {
        options.fields.iter().map(|field| Column::same(field)).collect()
    } else if !fields.is_empty() {
        fields
            .iter()
            .enumerate()
            .map(|(index, field)| Column {
                header: headers.get(index).cloned().unwrap_or_else(|| field.clone()),
                field: field.clone(),
            })
            .collect()
    } else if !headers.is_empty() {
        headers.iter().map(|header| Column::same(header)).collect()
    } else {
        infer_columns(rows).iter().map(|key| Column::same(key)).collect()
    };
    for extra in &options.afields {
        if !columns.iter().any(|column| &column.field == extra) {
            columns.push(Column::same(extra));
        }
    }
    columns
}

/// Display text of a JSON value.
pub fn cell_text(value: Option<&Value>, bools: &BoolMap) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::Bool(flag)) => bools.text(*flag).to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Text of `column` in `row`: transformed when a transform exists, otherwise
/// truncated per the request limits.
pub(crate) fn column_text(
    row: &Value,
    column: &Column,
    request: &RenderRequest,
    options: &RenderOptions,
    truncate: bool,
) -> (String, bool) {
    let value = multi_get(row, &column.field);
    if let Some(transform) = request.transforms.get(&column.field) {
        return (transform(value.unwrap_or(&Value::Null), &options.style()), true);
    }
    let text = cell_text(value, &request.bool_map);
    if !truncate || options.notruncate || column.never_truncated() {
        return (text, false);
    }
    let width = request.max_column_width.unwrap_or(DEFAULT_MAX_COLUMN_WIDTH);
    (truncate_display(&text, width), false)
}

/// Pick up to six informative keys from the first rows.
pub(crate) fn infer_columns(rows: &[&Value]) -> Vec<String> {
    let mut score: HashMap<&str, i32> = HashMap::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for row in rows.iter().take(INFERENCE_SAMPLE) {
        let Value::Object(map) = row else { continue };
        for (key, value) in map {
            let key = key.as_str();
            if seen.insert(key) {
                first_seen.push(key);
            }
            let mut points = base_key_score(key) + frequency_boost(key);
            match value {
                Value::Array(items) => points -= (items.len() as i32).min(3) + 3,
                Value::Object(_) => points -= 5,
                Value::String(text) if text.len() > 80 => points -= 3,
                _ => {}
            }
            *score.entry(key).or_insert(0) += points;
        }
    }
    // Stable sort keeps document order among equal scores.
    let mut keys = first_seen;
    keys.sort_by_key(|key| -score.get(key).copied().unwrap_or_default());
    keys.into_iter().take(INFERRED_COLUMNS).map(str::to_string).collect()
}

fn base_key_score(key: &str) -> i32 {
    let lowered = key.to_lowercase();
    let mut points = 0;
    if lowered == "id" || lowered == "uuid" || lowered.ends_with("_id") {
        points += 10;
    }
    if lowered.contains("name") {
        points += 9;
    }
    if lowered.contains("status") || lowered.contains("state") {
        points += 8;
    }
    if lowered.ends_with("_at") || lowered.contains("date") {
        points += 7;
    }
    if lowered.contains("owner") || lowered.contains("type") {
        points += 4;
    }
    points
}

fn frequency_boost(key: &str) -> i32 {
    match key.to_lowercase().as_str() {
        "id" | "uuid" => 12,
        "name" | "hostname" => 11,
        "created_at" | "updated_at" => 8,
        "state" | "status" | "base_state" => 6,
        "type" | "kind" | "owner" => 6,
        "ip_address" | "parent" => 5,
        "description" => 3,
        _ => 0,
    }
}
