use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::aggregate::Aggregation;

pub const TOTAL_COLUMN: &str = "TOTAL (Selected)";
const TIME_COLUMN: &str = "startTs";

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Clone, Default)]
pub struct RenderOpts {
    pub columns_override: Option<Vec<String>>,
    pub sort_by: Option<String>,
    pub filter: Option<String>,
}

/// Prints a list of records as a table, or as one JSON array.
pub fn render_items<T: Serialize>(
    items: &[T],
    output: OutputFormat,
    render_opts: &RenderOpts,
    columns: Option<&[&str]>,
) -> Result<()> {
    let json = serde_json::to_value(items)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&json)?),
        OutputFormat::Pretty => {
            let rows = json.as_array().cloned().unwrap_or_default();
            match format_table(&rows, columns, render_opts) {
                Some(table) => print!("{table}"),
                None => println!("{}", serde_json::to_string_pretty(&json)?),
            }
        }
    }
    Ok(())
}

/// Prints a report: a pivot table with one column per label plus the total,
/// or the combined rows and total series as JSON.
pub fn render_report(
    aggregation: &Aggregation,
    output: OutputFormat,
    render_opts: &RenderOpts,
    caption: &str,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(aggregation)?),
        OutputFormat::Pretty => {
            println!("Wireless Client History");
            println!("{caption}");
            println!();
            let (columns, rows) = pivot(aggregation);
            let hint: Vec<&str> = columns.iter().map(String::as_str).collect();
            if let Some(table) = format_table(&rows, Some(hint.as_slice()), render_opts) {
                print!("{table}");
            }
        }
    }
    Ok(())
}

/// One row per timestamp; label cells are left empty where a series has no
/// value at that timestamp.
pub fn pivot(aggregation: &Aggregation) -> (Vec<String>, Vec<Value>) {
    let mut columns = vec![TIME_COLUMN.to_string()];
    columns.extend(aggregation.labels.iter().cloned());
    columns.push(TOTAL_COLUMN.to_string());

    let rows = aggregation
        .total
        .iter()
        .map(|total| {
            let mut row = Map::new();
            row.insert(
                TIME_COLUMN.into(),
                json!(total.start_ts.format("%Y-%m-%d %H:%M").to_string()),
            );
            for point in aggregation
                .rows
                .iter()
                .filter(|p| p.start_ts == total.start_ts)
            {
                row.insert(point.label.clone(), count_value(point.client_count));
            }
            row.insert(TOTAL_COLUMN.into(), count_value(total.client_count));
            Value::Object(row)
        })
        .collect();

    (columns, rows)
}

fn count_value(count: f64) -> Value {
    if count.fract() == 0.0 && count >= 0.0 && count <= u64::MAX as f64 {
        json!(count as u64)
    } else {
        json!(count)
    }
}

/// Column-aligned text table, or `None` when `rows` are not objects.
pub fn format_table(
    rows: &[Value],
    columns_hint: Option<&[&str]>,
    render_opts: &RenderOpts,
) -> Option<String> {
    if rows.is_empty() {
        return Some("No resources found.\n".into());
    }

    let first_obj = match &rows[0] {
        Value::Object(map) => map,
        _ => return None,
    };

    let has_value = |key: &str| {
        rows.iter()
            .any(|row| row.get(key).map(is_non_empty).unwrap_or(false))
    };

    let mut columns: Vec<String> = Vec::new();

    if let Some(override_cols) = &render_opts.columns_override {
        columns.extend(
            override_cols
                .iter()
                .filter(|k| has_value(k.as_str()))
                .cloned(),
        );
    }

    if columns.is_empty()
        && let Some(hint) = columns_hint
    {
        columns.extend(hint.iter().filter(|k| has_value(**k)).map(|k| k.to_string()));
    }

    if columns.is_empty() {
        // Up to 8 fields of the first object that carry a value somewhere.
        columns.extend(
            first_obj
                .keys()
                .filter(|k| has_value(k.as_str()))
                .take(8)
                .cloned(),
        );
    }

    if columns.is_empty() {
        return None;
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    let mut table: Vec<Vec<String>> = Vec::new();
    let needle = render_opts.filter.as_ref().map(|f| f.to_ascii_lowercase());

    for row in rows {
        if let Value::Object(map) = row {
            let out_row: Vec<String> = columns
                .iter()
                .map(|col| value_to_str(map.get(col).unwrap_or(&Value::Null)))
                .collect();
            if let Some(needle) = &needle
                && !out_row
                    .iter()
                    .any(|cell| cell.to_ascii_lowercase().contains(needle))
            {
                continue;
            }
            for (idx, cell) in out_row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
            table.push(out_row);
        }
    }

    if table.is_empty() {
        return Some("No resources found.\n".into());
    }

    if let Some(sort) = &render_opts.sort_by
        && let Some(idx) = columns.iter().position(|c| c == sort)
    {
        table.sort_by(|a, b| a[idx].cmp(&b[idx]));
    }

    let mut out = String::new();
    push_line(&mut out, &columns, &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &separator, &widths);
    for row in &table {
        push_line(&mut out, row, &widths);
    }
    Some(out)
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn value_to_str(value: &Value) -> String {
    match value {
        Value::Null => "".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) => true,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
