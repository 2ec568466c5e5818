use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::record::TextRecord;

/// Options for pulling text records out of a structured file.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Field holding the text in JSON / JSONL objects.
    pub text_field: String,
    /// Optional field holding a stable id; auto-generated otherwise.
    pub id_field: Option<String>,
    /// Prefix for auto-generated ids ("text" -> "text_0001").
    pub id_prefix: String,
    /// Skip records whose text is empty or whitespace-only.
    pub skip_empty: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            text_field: "text".to_string(),
            id_field: None,
            id_prefix: "text".to_string(),
            skip_empty: true,
        }
    }
}

/// Load text records from a file, dispatching on extension: `.json` (array
/// of objects), `.jsonl` (one object per line), and `.txt`/`.md` (one record
/// per non-empty line).
pub async fn load_records(path: &Path, options: &ReaderOptions) -> Result<Vec<TextRecord>> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let records = match extension {
        "json" => load_json(path, options).await?,
        "jsonl" => load_jsonl(path, options).await?,
        "txt" | "md" => load_lines(path, options).await?,
        _ => bail!("Unsupported file format: {extension}"),
    };

    debug!(path = %path.display(), records = records.len(), "loaded text records");
    Ok(records)
}

async fn load_json(path: &Path, options: &ReaderOptions) -> Result<Vec<TextRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))?;

    let Value::Array(items) = value else {
        bail!("Expected a top-level JSON array in {}", path.display());
    };

    let mut records = Vec::new();
    let mut auto_id = 0usize;
    for item in &items {
        if let Some(record) = record_from_value(item, options, &mut auto_id)? {
            records.push(record);
        }
    }
    Ok(records)
}

async fn load_jsonl(path: &Path, options: &ReaderOptions) -> Result<Vec<TextRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut records = Vec::new();
    let mut auto_id = 0usize;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).with_context(|| {
            format!("Invalid JSON on line {} of {}", line_no + 1, path.display())
        })?;
        if let Some(record) = record_from_value(&value, options, &mut auto_id)? {
            records.push(record);
        }
    }
    Ok(records)
}

async fn load_lines(path: &Path, options: &ReaderOptions) -> Result<Vec<TextRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut records = Vec::new();
    let mut auto_id = 0usize;
    for line in content.lines() {
        if options.skip_empty && line.trim().is_empty() {
            continue;
        }
        auto_id += 1;
        records.push(TextRecord {
            text_id: format!("{}_{auto_id:04}", options.id_prefix),
            text: line.to_string(),
        });
    }
    Ok(records)
}

fn record_from_value(
    value: &Value,
    options: &ReaderOptions,
    auto_id: &mut usize,
) -> Result<Option<TextRecord>> {
    let Value::Object(object) = value else {
        bail!("Expected a JSON object, got: {value}");
    };

    let Some(text) = object.get(&options.text_field).and_then(Value::as_str) else {
        let available: Vec<&String> = object.keys().collect();
        bail!(
            "Field '{}' not found or not a string. Available: {available:?}",
            options.text_field
        );
    };

    if options.skip_empty && text.trim().is_empty() {
        return Ok(None);
    }

    let text_id = match &options.id_field {
        Some(field) => match object.get(field) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => bail!("ID field '{field}' not found in record"),
        },
        None => {
            *auto_id += 1;
            format!("{}_{:04}", options.id_prefix, auto_id)
        }
    };

    Ok(Some(TextRecord {
        text_id,
        text: text.to_string(),
    }))
}
