use serde_json::Value;

use crate::error::StoreError;

/// A validated document path: an even number of non-empty segments,
/// alternating collection and document ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath<'a> {
    segments: Vec<&'a str>,
}

impl<'a> DocumentPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self, StoreError> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// The user id of the enclosing `users/{uid}` document, if any.
    pub fn owner(&self) -> Option<&'a str> {
        match self.segments.as_slice() {
            ["users", uid, ..] => Some(*uid),
            _ => None,
        }
    }
}

/// Convert a dotted field path (`googleCalendar.access_token`) to a SQLite
/// JSON path (`$.googleCalendar.access_token`).
pub fn json_path(field: &str) -> Result<String, StoreError> {
    let valid = !field.is_empty()
        && field.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(format!("$.{field}"))
}

/// Merge `patch` into `target` the way a document merge-write does: nested
/// objects merge key by key, everything else is replaced.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => merge_json(slot, value),
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
