//! Field-level merging of configuration layers.
//!
//! # Responsibilities
//! - Deep-merge a parsed file over the current configuration tree
//! - Overlay prefixed environment variables onto existing fields
//!
//! # Design Decisions
//! - Mappings merge recursively; scalars and sequences are replaced
//! - Environment variables only target fields that already exist in the tree
//! - Value parsing is driven by the type of the field being replaced

use serde_json::{Map, Value};

use crate::config::env::Environment;
use crate::config::loader::ConfigError;

/// Merge `overlay` into `base`, letting `overlay` win on every field it sets.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Overlay every `{prefix}_*` variable that names an existing field.
///
/// `PREFIX_DB_HOST` targets `db.host` (or a top-level `db_host`). Names are
/// compared upper-cased with `-` and `.` folded to `_`.
pub fn apply_env(target: &mut Value, env: &Environment, prefix: &str) -> Result<(), ConfigError> {
    apply_env_checked(target, env, prefix, &|_| Ok(()))
}

/// Like [`apply_env`], validating the whole tree after every variable.
///
/// Fields that are currently `null` take the flow-parsed value when `check`
/// accepts it and the raw text otherwise, so an unset optional string is not
/// turned into a number by a numeric-looking value.
pub fn apply_env_checked(
    target: &mut Value,
    env: &Environment,
    prefix: &str,
    check: &dyn Fn(&Value) -> Result<(), String>,
) -> Result<(), ConfigError> {
    for (key, raw) in env.with_prefix(prefix) {
        let Some(path) = target.as_object().and_then(|map| field_path(map, key)) else {
            continue;
        };

        let pointer: String = path
            .iter()
            .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
            .collect();
        let overlay_error = |message| ConfigError::EnvOverlay {
            key: format!("{prefix}_{key}"),
            message,
        };

        let Some(slot) = target.pointer_mut(&pointer) else {
            continue;
        };
        let was_null = slot.is_null();
        *slot = parse_env_value(slot, raw).map_err(overlay_error)?;

        if let Err(message) = check(target) {
            let retried = was_null
                && target
                    .pointer(&pointer)
                    .is_some_and(|value| !value.is_string());
            if !retried {
                return Err(overlay_error(message));
            }
            if let Some(slot) = target.pointer_mut(&pointer) {
                *slot = Value::String(raw.to_string());
            }
            check(target).map_err(|_| overlay_error(message))?;
        }

        tracing::debug!(key = %format!("{prefix}_{key}"), field = %path.join("."), "Config field set from env");
    }

    Ok(())
}

/// Upper-case, underscore-separated form of a field name.
pub fn env_key(name: &str) -> String {
    name.replace(['-', '.', ' '], "_").to_uppercase()
}

fn field_path(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    if let Some(name) = map.keys().find(|name| env_key(name) == key) {
        return Some(vec![name.clone()]);
    }

    for (name, value) in map {
        let Value::Object(inner) = value else {
            continue;
        };
        let upper = env_key(name);
        let Some(rest) = key.strip_prefix(upper.as_str()).and_then(|r| r.strip_prefix('_')) else {
            continue;
        };
        if let Some(mut path) = field_path(inner, rest) {
            path.insert(0, name.clone());
            return Some(path);
        }
    }

    None
}

fn parse_env_value(current: &Value, raw: &str) -> Result<Value, String> {
    match current {
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("expected a boolean, got {raw:?}")),
        },
        Value::Number(_) => match parse_flow(raw)? {
            number @ Value::Number(_) => Ok(number),
            _ => Err(format!("expected a number, got {raw:?}")),
        },
        Value::Array(_) => match parse_flow(raw)? {
            array @ Value::Array(_) => Ok(array),
            _ => Err(format!("expected a sequence, got {raw:?}")),
        },
        Value::Object(_) => match parse_flow(raw)? {
            object @ Value::Object(_) => Ok(object),
            _ => Err(format!("expected a mapping, got {raw:?}")),
        },
        Value::Null => Ok(parse_flow(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
    }
}

fn parse_flow(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(raw).map_err(|e| e.to_string())
}
