//! Shared helpers for command handlers.

use std::path::Path;

use serde_json::{Map, Value};

use crate::cli::ItemFields;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Build a request payload from `--from-file` or `--name`/`--description`.
///
/// `require_name` rejects a create without a name before it reaches the
/// backend.
pub fn build_payload(fields: &ItemFields, require_name: bool) -> Result<Value, CliError> {
    if let Some(ref path) = fields.from_file {
        let value = read_json_file(path)?;
        if !value.is_object() {
            return Err(CliError::Validation {
                field: "from-file".into(),
                reason: "expected a JSON object".into(),
            });
        }
        return Ok(value);
    }

    let mut payload = Map::new();
    match fields.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            payload.insert("name".into(), Value::String(name.to_owned()));
        }
        _ if require_name => {
            return Err(CliError::Validation {
                field: "name".into(),
                reason: "a name is required".into(),
            });
        }
        _ => {}
    }
    if let Some(ref description) = fields.description {
        payload.insert("description".into(), Value::String(description.clone()));
    }
    if payload.is_empty() {
        return Err(CliError::Validation {
            field: "input".into(),
            reason: "nothing to change; pass --name, --description, or --from-file".into(),
        });
    }
    Ok(Value::Object(payload))
}
