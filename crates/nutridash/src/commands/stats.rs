//! Summary statistics command handler.

use serde_json::Value;

use nutridash_core::{Dashboard, ResourceKind, StatsState};

use crate::cli::{GlobalOpts, StatsArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    dashboard: &Dashboard,
    args: StatsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    match dashboard.stats().reload(kind).await {
        StatsState::Loaded(value) => {
            let out = output::render_single(&global.output, &*value, detail, |_| {
                kind.to_string()
            })?;
            output::print_output(&out, global.quiet);
        }
        StatsState::Loading | StatsState::Unavailable => {
            if !global.quiet {
                eprintln!("Statistics for {kind} are unavailable right now");
            }
        }
    }
    Ok(())
}

/// `key: value` lines; nested objects are flattened with dotted keys.
fn detail(value: &Value) -> String {
    let mut lines = Vec::new();
    flatten("", value, &mut lines);
    lines.join("\n")
}

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&key, inner, lines);
            }
        }
        Value::String(s) => lines.push(format!("{prefix}: {s}")),
        other => lines.push(format!("{prefix}: {other}")),
    }
}
