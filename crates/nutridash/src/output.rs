//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, Write};
use std::sync::Arc;

use serde_json::{Map, Value};
use tabled::{Table, Tabled, settings::Style};

use nutridash_core::Item;

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single item. Table mode uses `detail_fn`, since detail views
/// are key/value text rather than a `Tabled` row.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Item rendering ───────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<&Arc<Item>> for ItemRow {
    fn from(item: &Arc<Item>) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item
                .description
                .as_deref()
                .map_or_else(String::new, truncate),
        }
    }
}

const DESCRIPTION_WIDTH: usize = 48;

fn truncate(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_WIDTH {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(DESCRIPTION_WIDTH - 1).collect();
    short.push('…');
    short
}

pub fn render_items(format: &OutputFormat, items: &[Arc<Item>]) -> Result<String, CliError> {
    render_list(format, items, |item| ItemRow::from(item), |item| item.id.clone())
}

pub fn render_item(format: &OutputFormat, item: &Arc<Item>) -> Result<String, CliError> {
    render_single(format, item, |item| item_detail(item), |item| item.id.clone())
}

fn item_detail(item: &Item) -> String {
    let mut lines = vec![
        format!("ID:          {}", item.id),
        format!("Name:        {}", item.name),
    ];
    if let Some(ref description) = item.description {
        lines.push(format!("Description: {description}"));
    }
    lines.extend(item.fields.iter().map(|(key, value)| field_line(key, value)));
    lines.join("\n")
}

/// Render what was submitted for `id` when the backend confirmed a change
/// without returning the item.
pub fn render_submitted(
    format: &OutputFormat,
    id: &str,
    payload: &Value,
) -> Result<String, CliError> {
    let mut fields = Map::new();
    fields.insert("id".into(), Value::String(id.to_owned()));
    if let Some(obj) = payload.as_object() {
        fields.extend(
            obj.iter()
                .filter(|(key, _)| key.as_str() != "id")
                .map(|(key, value)| (key.clone(), value.clone())),
        );
    }
    render_single(
        format,
        &fields,
        |fields| {
            fields
                .iter()
                .map(|(key, value)| field_line(key, value))
                .collect::<Vec<_>>()
                .join("\n")
        },
        |_| id.to_owned(),
    )
}

fn field_line(key: &str, value: &Value) -> String {
    let value = value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned);
    let label = format!("{key}:");
    format!("{label:<13}{value}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> Arc<Item> {
        Arc::new(Item::new(id, name))
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let out = render_items(&OutputFormat::Plain, &[item("1", "oats"), item("2", "rice")]).unwrap();
        assert_eq!(out, "1\n2");
    }

    #[test]
    fn json_keeps_extra_fields() {
        let mut raw = Item::new("7", "salmon");
        raw.fields.insert("calories".into(), serde_json::json!(208));
        let out = render_items(&OutputFormat::JsonCompact, &[Arc::new(raw)]).unwrap();
        assert_eq!(out, r#"[{"id":"7","name":"salmon","calories":208}]"#);
    }

    #[test]
    fn long_descriptions_are_truncated_in_tables() {
        let long = "x".repeat(100);
        let short = truncate(&long);
        assert_eq!(short.chars().count(), DESCRIPTION_WIDTH);
        assert!(short.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn detail_lists_fields() {
        let mut raw = Item::new("3", "peanut");
        raw.description = Some("tree nut".into());
        raw.fields.insert("severity".into(), serde_json::json!("high"));
        let out = render_item(&OutputFormat::Table, &Arc::new(raw)).unwrap();
        assert!(out.contains("Name:        peanut"));
        assert!(out.contains("Description: tree nut"));
        assert!(out.contains("severity:    high"));
    }

    #[test]
    fn submitted_fields_render_without_a_name() {
        let payload = serde_json::json!({ "description": "low sodium", "id": "ignored" });
        let out = render_submitted(&OutputFormat::JsonCompact, "9", &payload).unwrap();
        assert_eq!(out, r#"{"description":"low sodium","id":"9"}"#);

        let out = render_submitted(&OutputFormat::Table, "9", &payload).unwrap();
        assert!(out.contains("id:          9"));
        assert!(out.contains("description: low sodium"));
        assert!(!out.contains("Name"));
    }
}
