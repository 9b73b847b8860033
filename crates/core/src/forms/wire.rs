//! Conversion between in-memory form records and API payloads.
//!
//! Outgoing: names are mapped to their wire names, dates become canonical
//! UTC timestamps, blank rows and un-uploaded attachments are left out,
//! and nothing that is not in the schema is ever emitted.
//!
//! Incoming: wire names are mapped back and timestamps are reduced to
//! dates. Missing values stay missing; template defaults are only for new
//! records and new rows.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::controller::{Fields, FormRecord, Row, RowData, RowId};
use super::{FieldKind, FieldPath, FieldSpec, FieldValue, FormSchema, ItemShape, ListSpec};
use crate::error::CoreError;
use crate::filters::FILTER_DATE_FORMAT;
use crate::upload::UploadSlot;

/// Wire key holding an attachment's title.
pub const ATTACHMENT_TITLE_KEY: &str = "title";

/// Wire key holding an attachment's uploaded URL.
pub const ATTACHMENT_URL_KEY: &str = "fileUrl";

/// Render a date as the canonical midnight-UTC timestamp the API stores,
/// e.g. `2024-03-01T00:00:00.000Z`.
pub fn canonical_timestamp(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accept either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, FILTER_DATE_FORMAT).ok())
}

// ---------------------------------------------------------------------------
// Outgoing
// ---------------------------------------------------------------------------

pub(super) fn record_to_wire(schema: &FormSchema, record: &FormRecord) -> Value {
    let mut out = fields_to_json(schema.scalars, &record.scalars, &record.numeric, None);

    for object in schema.objects {
        if let Some(values) = record.objects.get(object.name) {
            out.insert(
                object.wire_name.to_string(),
                Value::Object(fields_to_json(
                    object.fields,
                    values,
                    &record.numeric,
                    Some(object.name),
                )),
            );
        }
    }

    for list in schema.lists {
        let items: Vec<Value> = record
            .lists
            .get(list.name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|row| row_to_json(list, row, &record.numeric))
            .collect();
        out.insert(list.wire_name.to_string(), Value::Array(items));
    }

    Value::Object(out)
}

/// Key under which a digit field that arrived as a JSON number is
/// remembered, so it goes back out as a number.
fn numeric_key(scope: Option<&str>, field: &str) -> String {
    match scope {
        Some(scope) => format!("{scope}.{field}"),
        None => field.to_string(),
    }
}

fn row_scope(list: &str, row: RowId) -> String {
    format!("{list}#{row}")
}

fn value_to_json(value: &FieldValue, numeric: bool) -> Value {
    match value {
        FieldValue::Text(s) if numeric => s
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(s.clone())),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Date(d) => Value::String(canonical_timestamp(*d)),
        FieldValue::Flag(b) => Value::Bool(*b),
    }
}

fn fields_to_json(
    specs: &[FieldSpec],
    values: &Fields,
    numeric: &BTreeSet<String>,
    scope: Option<&str>,
) -> Map<String, Value> {
    specs
        .iter()
        .filter_map(|spec| {
            let value = values.get(spec.name)?;
            let numeric = numeric.contains(&numeric_key(scope, spec.name));
            Some((spec.wire_name.to_string(), value_to_json(value, numeric)))
        })
        .collect()
}

fn row_to_json(list: &ListSpec, row: &Row, numeric: &BTreeSet<String>) -> Option<Value> {
    match (&list.shape, &row.data) {
        (ItemShape::Fields(fields), RowData::Fields(values)) => {
            if is_blank_row(fields, values) {
                None
            } else {
                let scope = row_scope(list.name, row.id);
                Some(Value::Object(fields_to_json(
                    fields,
                    values,
                    numeric,
                    Some(scope.as_str()),
                )))
            }
        }
        (ItemShape::Attachment, RowData::Attachment(slot)) => slot.file_url.as_ref().map(|url| {
            let mut item = Map::new();
            item.insert(ATTACHMENT_TITLE_KEY.to_string(), Value::String(slot.title.clone()));
            item.insert(ATTACHMENT_URL_KEY.to_string(), Value::String(url.clone()));
            Value::Object(item)
        }),
        _ => None,
    }
}

/// A row is blank when every text field in it is empty or absent.
///
/// Rows without any text field are never blank.
pub(super) fn is_blank_row(fields: &[FieldSpec], values: &Fields) -> bool {
    let mut text_fields = fields
        .iter()
        .filter(|f| matches!(f.kind, FieldKind::Text | FieldKind::Digits { .. }))
        .peekable();
    text_fields.peek().is_some()
        && text_fields.all(|f| values.get(f.name).map_or(true, FieldValue::is_blank))
}

// ---------------------------------------------------------------------------
// Incoming
// ---------------------------------------------------------------------------

/// Decode a fetched record.
///
/// Keys that are missing or null stay absent from the working copy, and
/// absent keys are never submitted. Objects the record does not carry are
/// left out the same way.
pub(super) fn record_from_wire(
    schema: &FormSchema,
    wire: &Value,
    next_row_id: &mut RowId,
) -> Result<FormRecord, CoreError> {
    let obj = wire.as_object().ok_or_else(|| {
        CoreError::Validation(format!("{} payload must be a JSON object", schema.name))
    })?;
    let empty = Map::new();
    let mut record = FormRecord::default();

    record.scalars = fields_from_json(schema.scalars, obj, None, &mut record.numeric, |field| {
        FieldPath::Scalar(field)
    })?;

    for object in schema.objects {
        let Some(nested) = obj.get(object.wire_name).and_then(Value::as_object) else {
            continue;
        };
        let values = fields_from_json(
            object.fields,
            nested,
            Some(object.name),
            &mut record.numeric,
            |field| FieldPath::Object {
                object: object.name,
                field,
            },
        )?;
        record.objects.insert(object.name, values);
    }

    for list in schema.lists {
        let items = obj
            .get(list.wire_name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item = item.as_object().unwrap_or(&empty);
            *next_row_id += 1;
            let data = match list.shape {
                ItemShape::Fields(fields) => {
                    let scope = row_scope(list.name, *next_row_id);
                    RowData::Fields(fields_from_json(
                        fields,
                        item,
                        Some(scope.as_str()),
                        &mut record.numeric,
                        |field| FieldPath::ListItem {
                            list: list.name,
                            index,
                            field,
                        },
                    )?)
                }
                ItemShape::Attachment => RowData::Attachment(attachment_from_json(item)),
            };
            rows.push(Row {
                id: *next_row_id,
                data,
            });
        }
        record.lists.insert(list.name, rows);
    }

    Ok(record)
}

fn fields_from_json<'a>(
    specs: &[FieldSpec],
    obj: &Map<String, Value>,
    scope: Option<&str>,
    numeric: &mut BTreeSet<String>,
    path: impl Fn(&'static str) -> FieldPath<'a>,
) -> Result<Fields, CoreError> {
    let mut fields = Fields::new();
    for spec in specs {
        let value = match obj.get(spec.wire_name) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        if matches!(spec.kind, FieldKind::Digits { .. }) && value.is_u64() {
            numeric.insert(numeric_key(scope, spec.name));
        }
        fields.insert(spec.name, field_from_json(spec, value, &path(spec.name))?);
    }
    Ok(fields)
}

/// Values coming from the server are kept verbatim, including choice
/// values the form does not offer.
fn field_from_json(
    spec: &FieldSpec,
    value: &Value,
    path: &FieldPath<'_>,
) -> Result<FieldValue, CoreError> {
    match spec.kind {
        FieldKind::Text | FieldKind::Digits { .. } | FieldKind::Choice(_) => match value {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
            _ => Err(CoreError::TypeMismatch {
                path: path.to_string(),
                expected: "text",
            }),
        },
        FieldKind::Date => value
            .as_str()
            .and_then(parse_wire_date)
            .map(FieldValue::Date)
            .ok_or_else(|| CoreError::TypeMismatch {
                path: path.to_string(),
                expected: "date",
            }),
        FieldKind::Flag => value
            .as_bool()
            .map(FieldValue::Flag)
            .ok_or_else(|| CoreError::TypeMismatch {
                path: path.to_string(),
                expected: "boolean",
            }),
    }
}

fn attachment_from_json(item: &Map<String, Value>) -> UploadSlot {
    let title = item
        .get(ATTACHMENT_TITLE_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default();
    match item.get(ATTACHMENT_URL_KEY).and_then(Value::as_str) {
        Some(url) => UploadSlot::uploaded(title, url),
        None => UploadSlot {
            title: title.to_string(),
            ..UploadSlot::default()
        },
    }
}
