//! Value paths used inside templates
//!
//! Supports:
//! - `.` (the current value)
//! - `a.b.c` and `$.a.b` (dot notation)
//! - `items.0` and `items[0].name` (array index)

use serde_json::Value;

/// Resolve `path` against `value` without cloning
///
/// Returns `None` when any segment is missing or the path is malformed.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path == "." || path == "$" || path == "this" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }

        let (field, indexes) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };

        if !field.is_empty() {
            current = match (current, field.parse::<usize>()) {
                (Value::Array(items), Ok(idx)) => items.get(idx)?,
                _ => current.get(field)?,
            };
        }

        let mut rest = indexes;
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let idx: usize = rest.get(1..close)?.parse().ok()?;
            current = current.get(idx)?;
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }

    Some(current)
}
