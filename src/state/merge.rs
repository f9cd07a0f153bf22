//! Deep merge of partial updates into structured values.

use crate::error::{Result, ViewerError};
use crate::types::{ViewState, ViewStatePatch};
use serde_json::{Map, Value};

/// Merge `partial` into `base`, returning a new value.
///
/// Objects in `partial` merge recursively; a missing or non-object value in
/// `base` is treated as an empty object. Every other value replaces the base
/// value wholesale, arrays included. A `null` in `partial` removes the key.
/// Keys absent from `partial` are kept as they are in `base`.
pub fn deep_merge(partial: &Value, base: &Value) -> Value {
    let Value::Object(patch) = partial else {
        return partial.clone();
    };

    let mut merged = match base {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };

    for (key, value) in patch {
        match value {
            Value::Null => {
                merged.remove(key);
            }
            Value::Object(_) => {
                let existing = merged.get(key).unwrap_or(&Value::Null);
                let nested = deep_merge(value, existing);
                merged.insert(key.clone(), nested);
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    Value::Object(merged)
}

impl ViewState {
    /// Apply a partial update, producing the next snapshot.
    ///
    /// Fails if the merged value no longer decodes as a view state or breaks
    /// the viewport invariants (finite coordinates, non-negative zoom).
    pub fn merged(&self, patch: &ViewStatePatch) -> Result<ViewState> {
        if patch.is_empty() {
            return Ok(self.clone());
        }

        let base = serde_json::to_value(self)?;
        let partial = serde_json::to_value(patch)?;
        let merged = deep_merge(&partial, &base);

        let next: ViewState = serde_json::from_value(merged)
            .map_err(|e| ViewerError::InvalidPatch(e.to_string()))?;

        next.validate()?;
        Ok(next)
    }

    /// Check the viewport invariants: finite coordinates, non-negative zoom.
    pub(crate) fn validate(&self) -> Result<()> {
        let coords = self.coords;
        if !coords.longitude.is_finite() || !coords.latitude.is_finite() {
            return Err(ViewerError::InvalidPatch(format!(
                "non-finite viewport ({}, {})",
                coords.longitude, coords.latitude
            )));
        }
        if !coords.zoom.is_finite() || coords.zoom < 0.0 {
            return Err(ViewerError::InvalidPatch(format!(
                "zoom must be non-negative, got {}",
                coords.zoom
            )));
        }
        Ok(())
    }
}
