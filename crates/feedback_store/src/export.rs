//! Flat CSV export of feedback records.
//!
//! Columns are the fixed identity columns followed by the sorted union of
//! answer keys across every exported record. An answer key that names a fixed
//! column or starts with `answer_` is written with an extra `answer_` prefix,
//! which parsing strips again. Fields are quoted per RFC 4180
//! whenever they contain a delimiter, a quote or a line break, so any value
//! survives `parse_table`. Identical record sets always produce identical bytes.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::FeedbackStoreError;
use crate::schema::FeedbackRecord;

pub const FIXED_COLUMNS: [&str; 6] = [
    "record_id",
    "snippet_id",
    "snippet_name",
    "style",
    "model",
    "submitted_at",
];

const DELIMITER: char = ',';
const QUOTE: char = '"';
const ANSWER_COLLISION_PREFIX: &str = "answer_";

/// Result of exporting the feedback log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackExport {
    /// No records exist.
    Empty,
    /// Header row plus one row per record, each terminated by `\n`.
    Csv(String),
}

impl FeedbackExport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn as_csv(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Csv(table) => Some(table),
        }
    }
}

/// Column order for `records`: fixed columns, then answer columns.
#[must_use]
pub fn header_for(records: &[FeedbackRecord]) -> Vec<String> {
    let answer_columns: BTreeSet<String> = records
        .iter()
        .flat_map(|record| record.answers.keys())
        .map(|key| answer_column(key))
        .collect();

    FIXED_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .chain(answer_columns)
        .collect()
}

#[must_use]
pub fn export_records(records: &[FeedbackRecord]) -> FeedbackExport {
    if records.is_empty() {
        return FeedbackExport::Empty;
    }

    let header = header_for(records);
    let mut table = String::new();
    push_row(&mut table, header.iter().map(|column| Cow::Borrowed(column.as_str())));

    for record in records {
        let cells = header.iter().map(|column| cell_for(record, column));
        push_row(&mut table, cells);
    }

    FeedbackExport::Csv(table)
}

/// Parses an exported table into one column-name → value map per data row.
pub fn parse_table(text: &str) -> Result<Vec<BTreeMap<String, String>>, FeedbackStoreError> {
    let mut rows = split_rows(text)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };

    rows.map(|(line, fields)| -> Result<BTreeMap<String, String>, FeedbackStoreError> {
        if fields.len() != header.len() {
            return Err(FeedbackStoreError::malformed(
                line,
                format!("expected {} fields, found {}", header.len(), fields.len()),
            ));
        }
        Ok(header.iter().cloned().zip(fields).collect())
    })
    .collect()
}

/// Rebuilds feedback records from an exported table.
pub fn records_from_table(text: &str) -> Result<Vec<FeedbackRecord>, FeedbackStoreError> {
    parse_table(text)?
        .into_iter()
        .enumerate()
        .map(|(index, mut row)| -> Result<FeedbackRecord, FeedbackStoreError> {
            let line = index + 2;
            let mut take = |column: &str| {
                row.remove(column).ok_or_else(|| {
                    FeedbackStoreError::malformed(line, format!("missing column '{column}'"))
                })
            };

            let record_id = take("record_id")?;
            let snippet_id = take("snippet_id")?;
            let snippet_name = take("snippet_name")?;
            let style = take("style")?;
            let model = take("model")?;
            let submitted_at = take("submitted_at")?;

            let mut answers = BTreeMap::new();
            for (column, value) in row {
                let answer = match value.as_str() {
                    "" => continue,
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(FeedbackStoreError::malformed(
                            line,
                            format!("answer '{column}' is not a boolean: {other}"),
                        ))
                    }
                };
                answers.insert(answer_key(&column).to_string(), answer);
            }

            Ok(FeedbackRecord {
                record_id,
                snippet_id,
                snippet_name,
                style,
                model,
                answers,
                submitted_at,
            })
        })
        .collect()
}

/// Maps an answer key to its column. Keys naming a fixed column or already
/// carrying the prefix are prefixed, so the mapping stays one-to-one.
fn answer_column(key: &str) -> String {
    if FIXED_COLUMNS.contains(&key) || key.starts_with(ANSWER_COLLISION_PREFIX) {
        format!("{ANSWER_COLLISION_PREFIX}{key}")
    } else {
        key.to_string()
    }
}

fn answer_key(column: &str) -> &str {
    column
        .strip_prefix(ANSWER_COLLISION_PREFIX)
        .unwrap_or(column)
}

fn cell_for<'a>(record: &'a FeedbackRecord, column: &str) -> Cow<'a, str> {
    let fixed = match column {
        "record_id" => Some(&record.record_id),
        "snippet_id" => Some(&record.snippet_id),
        "snippet_name" => Some(&record.snippet_name),
        "style" => Some(&record.style),
        "model" => Some(&record.model),
        "submitted_at" => Some(&record.submitted_at),
        _ => None,
    };
    if let Some(value) = fixed {
        return Cow::Borrowed(value.as_str());
    }

    match record.answers.get(answer_key(column)) {
        Some(true) => Cow::Borrowed("true"),
        Some(false) => Cow::Borrowed("false"),
        None => Cow::Borrowed(""),
    }
}

fn push_row<'a>(table: &mut String, cells: impl Iterator<Item = Cow<'a, str>>) {
    for (index, cell) in cells.enumerate() {
        if index > 0 {
            table.push(DELIMITER);
        }
        table.push_str(&escape_field(&cell));
    }
    table.push('\n');
}

fn escape_field(value: &str) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| matches!(c, DELIMITER | QUOTE | '\n' | '\r'));
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            quoted.push(QUOTE);
        }
        quoted.push(c);
    }
    quoted.push(QUOTE);
    Cow::Owned(quoted)
}

fn split_rows(text: &str) -> Result<Vec<(usize, Vec<String>)>, FeedbackStoreError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut row_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                QUOTE if chars.peek() == Some(&QUOTE) => {
                    chars.next();
                    field.push(QUOTE);
                }
                QUOTE => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            QUOTE if field.is_empty() => in_quotes = true,
            QUOTE => {
                return Err(FeedbackStoreError::malformed(
                    line,
                    "quote inside an unquoted field",
                ))
            }
            DELIMITER => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push((row_line, std::mem::take(&mut row)));
                line += 1;
                row_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(FeedbackStoreError::malformed(row_line, "unterminated quoted field"));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push((row_line, row));
    }

    Ok(rows)
}
