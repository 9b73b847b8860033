use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde_json::Value;

use super::wire::{self, is_blank_row};
use super::{FieldPath, FieldSpec, FieldValue, FormSchema, ItemShape, ListSpec};
use crate::error::CoreError;
use crate::types::RecordId;
use crate::upload::{LocalFileMeta, UploadAttempt, UploadSlot};

/// Field name addressing an attachment row's title.
pub const ATTACHMENT_TITLE_FIELD: &str = "title";

/// Stable identity of a list row, independent of its current index.
pub type RowId = u64;

pub(crate) type Fields = BTreeMap<&'static str, FieldValue>;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowData {
    Fields(BTreeMap<&'static str, FieldValue>),
    Attachment(UploadSlot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: RowId,
    pub data: RowData,
}

/// The working copy edited by a [`FormController`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRecord {
    pub scalars: BTreeMap<&'static str, FieldValue>,
    pub objects: BTreeMap<&'static str, BTreeMap<&'static str, FieldValue>>,
    pub lists: BTreeMap<&'static str, Vec<Row>>,
    /// Digit fields that arrived as JSON numbers and are sent back as such.
    pub numeric: BTreeSet<String>,
}

/// Whether submitting creates a new record or updates an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: RecordId },
}

/// Handle for an in-flight upload, returned by
/// [`FormController::begin_upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    pub list: &'static str,
    pub row: RowId,
    pub attempt: UploadAttempt,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Generic editor for any [`FormSchema`].
///
/// All mutations are synchronous and apply in call order. Nothing here
/// touches the network; submission and uploads are driven by the client
/// crate through [`to_wire`](Self::to_wire) and the upload ticket methods.
#[derive(Debug, Clone)]
pub struct FormController {
    schema: &'static FormSchema,
    mode: FormMode,
    record: FormRecord,
    today: NaiveDate,
    last_row_id: RowId,
}

impl FormController {
    /// Empty form for a new entity. Lists get their initial template rows.
    pub fn new_record(schema: &'static FormSchema, today: NaiveDate) -> Self {
        let record = FormRecord {
            scalars: template_fields(schema.scalars, today),
            objects: schema
                .objects
                .iter()
                .map(|o| (o.name, template_fields(o.fields, today)))
                .collect(),
            ..FormRecord::default()
        };
        let mut form = Self {
            schema,
            mode: FormMode::Create,
            record,
            today,
            last_row_id: 0,
        };
        form.pad_lists();
        form
    }

    /// Form pre-filled from a fetched record, in edit mode.
    ///
    /// The record id is read from `_id` (or `id`). Lists are padded with
    /// template rows up to their seeded length. Fields the record leaves out
    /// stay out of the payload until they are set.
    pub fn hydrate(
        schema: &'static FormSchema,
        wire: &Value,
        today: NaiveDate,
    ) -> Result<Self, CoreError> {
        let id = record_id(wire).ok_or_else(|| {
            CoreError::Validation(format!("{} record has no id", schema.name))
        })?;
        let mut last_row_id = 0;
        let record = wire::record_from_wire(schema, wire, &mut last_row_id)?;
        let mut form = Self {
            schema,
            mode: FormMode::Edit { id },
            record,
            today,
            last_row_id,
        };
        form.pad_lists();
        Ok(form)
    }

    pub fn schema(&self) -> &'static FormSchema {
        self.schema
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    // ---- field access ----

    /// Current value at `path`. Attachment titles read as text, and a field
    /// the record does not carry reads as its template value.
    pub fn value(&self, path: FieldPath<'_>) -> Result<FieldValue, CoreError> {
        let unknown = || CoreError::UnknownField {
            path: path.to_string(),
        };
        let template = |spec: Option<&FieldSpec>| {
            spec.map(|spec| FieldValue::template(spec.kind, self.today))
                .ok_or_else(unknown)
        };
        match path {
            FieldPath::Scalar(field) => match self.record.scalars.get(field) {
                Some(value) => Ok(value.clone()),
                None => template(self.schema.scalar(field)),
            },
            FieldPath::Object { object, field } => {
                let spec = self.schema.object(object).ok_or_else(unknown)?;
                match self.record.objects.get(spec.name).and_then(|v| v.get(field)) {
                    Some(value) => Ok(value.clone()),
                    None => template(find_field(spec.fields, field)),
                }
            }
            FieldPath::ListItem { list, index, field } => {
                let (spec, rows) = self.rows_entry(list)?;
                let row = rows.get(index).ok_or_else(|| CoreError::IndexOutOfRange {
                    list: list.to_string(),
                    index,
                    len: rows.len(),
                })?;
                match (&spec.shape, &row.data) {
                    (ItemShape::Fields(fields), RowData::Fields(values)) => {
                        match values.get(field) {
                            Some(value) => Ok(value.clone()),
                            None => template(find_field(fields, field)),
                        }
                    }
                    (_, RowData::Attachment(slot)) if field == ATTACHMENT_TITLE_FIELD => {
                        Ok(FieldValue::Text(slot.title.clone()))
                    }
                    _ => Err(unknown()),
                }
            }
        }
    }

    /// Set the value at `path`.
    ///
    /// The value must fit the field's kind; digit fields are sanitised.
    /// No business validation happens here.
    pub fn set_field(
        &mut self,
        path: FieldPath<'_>,
        value: impl Into<FieldValue>,
    ) -> Result<(), CoreError> {
        let value = value.into();
        let unknown = || CoreError::UnknownField {
            path: path.to_string(),
        };

        match path {
            FieldPath::Scalar(field) => {
                let spec = self.schema.scalar(field).ok_or_else(unknown)?;
                let value = value.coerce(spec.kind, &path)?;
                self.record.scalars.insert(spec.name, value);
            }
            FieldPath::Object { object, field } => {
                let object_spec = self.schema.object(object).ok_or_else(unknown)?;
                let spec = find_field(object_spec.fields, field).ok_or_else(unknown)?;
                let value = value.coerce(spec.kind, &path)?;
                self.record
                    .objects
                    .entry(object_spec.name)
                    .or_default()
                    .insert(spec.name, value);
            }
            FieldPath::ListItem { list, index, field } => {
                let (list_spec, rows) = self.rows_entry_mut(list)?;
                let len = rows.len();
                let row = rows.get_mut(index).ok_or_else(|| CoreError::IndexOutOfRange {
                    list: list.to_string(),
                    index,
                    len,
                })?;
                match (&list_spec.shape, &mut row.data) {
                    (ItemShape::Fields(fields), RowData::Fields(values)) => {
                        let spec = find_field(fields, field).ok_or_else(unknown)?;
                        let value = value.coerce(spec.kind, &path)?;
                        values.insert(spec.name, value);
                    }
                    (ItemShape::Attachment, RowData::Attachment(slot))
                        if field == ATTACHMENT_TITLE_FIELD =>
                    {
                        match value {
                            FieldValue::Text(title) => slot.title = title,
                            _ => {
                                return Err(CoreError::TypeMismatch {
                                    path: path.to_string(),
                                    expected: "text",
                                })
                            }
                        }
                    }
                    _ => return Err(unknown()),
                }
            }
        }
        Ok(())
    }

    // ---- list editing ----

    pub fn rows(&self, list: &str) -> Result<&[Row], CoreError> {
        self.rows_entry(list).map(|(_, rows)| rows.as_slice())
    }

    /// Append a template row. Returns its index.
    pub fn add_list_item(&mut self, list: &str) -> Result<usize, CoreError> {
        let spec = self.list_spec(list)?;
        let row = self.new_row(spec);
        let rows = self.record.lists.entry(spec.name).or_default();
        rows.push(row);
        Ok(rows.len() - 1)
    }

    /// Whether the row at `index` may be removed under the list's policy.
    pub fn can_remove(&self, list: &str, index: usize) -> bool {
        self.rows_entry(list)
            .map(|(spec, rows)| index < rows.len() && rows.len() > spec.policy.min_items)
            .unwrap_or(false)
    }

    /// Remove the row at `index`, refusing to go below the list's minimum.
    pub fn remove_list_item(&mut self, list: &str, index: usize) -> Result<(), CoreError> {
        let (spec, rows) = self.rows_entry_mut(list)?;
        if index >= rows.len() {
            return Err(CoreError::IndexOutOfRange {
                list: list.to_string(),
                index,
                len: rows.len(),
            });
        }
        if rows.len() <= spec.policy.min_items {
            return Err(CoreError::MinimumItems {
                list: list.to_string(),
                min: spec.policy.min_items,
            });
        }
        rows.remove(index);
        Ok(())
    }

    // ---- uploads ----

    pub fn slot(&self, list: &str, index: usize) -> Result<&UploadSlot, CoreError> {
        let (_, rows) = self.rows_entry(list)?;
        match rows.get(index).map(|r| &r.data) {
            Some(RowData::Attachment(slot)) => Ok(slot),
            Some(RowData::Fields(_)) => Err(CoreError::TypeMismatch {
                path: format!("{list}[{index}]"),
                expected: "attachment",
            }),
            None => Err(CoreError::IndexOutOfRange {
                list: list.to_string(),
                index,
                len: rows.len(),
            }),
        }
    }

    /// Mark the attachment at `index` as uploading `file`.
    pub fn begin_upload(
        &mut self,
        list: &str,
        index: usize,
        file: LocalFileMeta,
    ) -> Result<UploadTicket, CoreError> {
        let (spec, rows) = self.rows_entry_mut(list)?;
        let len = rows.len();
        let row = rows.get_mut(index).ok_or_else(|| CoreError::IndexOutOfRange {
            list: list.to_string(),
            index,
            len,
        })?;
        match &mut row.data {
            RowData::Attachment(slot) => Ok(UploadTicket {
                list: spec.name,
                row: row.id,
                attempt: slot.select_file(file),
            }),
            RowData::Fields(_) => Err(CoreError::TypeMismatch {
                path: format!("{list}[{index}]"),
                expected: "attachment",
            }),
        }
    }

    /// Store the uploaded URL. Returns `false` when the row is gone or a
    /// newer file was selected in the meantime.
    pub fn finish_upload(&mut self, ticket: &UploadTicket, url: &str) -> bool {
        self.ticket_slot(ticket)
            .is_some_and(|slot| slot.complete(ticket.attempt, url))
    }

    /// Record an upload failure. Same staleness rules as
    /// [`finish_upload`](Self::finish_upload).
    pub fn fail_upload(&mut self, ticket: &UploadTicket, message: &str) -> bool {
        self.ticket_slot(ticket)
            .is_some_and(|slot| slot.fail(ticket.attempt, message))
    }

    /// First attachment still uploading, as `(list, index)`.
    pub fn upload_in_flight(&self) -> Option<(&'static str, usize)> {
        self.record.lists.iter().find_map(|(list, rows)| {
            rows.iter().position(|row| {
                matches!(&row.data, RowData::Attachment(slot) if slot.is_uploading)
            })
            .map(|index| (*list, index))
        })
    }

    // ---- submission ----

    /// Check required fields. Blank list rows and objects the record does
    /// not carry are skipped since they are not submitted.
    pub fn validate_required(&self) -> Result<(), CoreError> {
        let mut missing = Vec::new();

        for spec in self.schema.scalars.iter().filter(|f| f.required) {
            if self.record.scalars.get(spec.name).map_or(true, FieldValue::is_blank) {
                missing.push(spec.name.to_string());
            }
        }

        for object in self.schema.objects {
            let Some(values) = self.record.objects.get(object.name) else {
                continue;
            };
            for spec in object.fields.iter().filter(|f| f.required) {
                if values.get(spec.name).map_or(true, FieldValue::is_blank)
                {
                    missing.push(format!("{}.{}", object.name, spec.name));
                }
            }
        }

        for list in self.schema.lists {
            let ItemShape::Fields(fields) = list.shape else {
                continue;
            };
            let rows = self.record.lists.get(list.name).map(Vec::as_slice).unwrap_or_default();
            for (index, row) in rows.iter().enumerate() {
                let RowData::Fields(values) = &row.data else {
                    continue;
                };
                if is_blank_row(fields, values) {
                    continue;
                }
                for spec in fields.iter().filter(|f| f.required) {
                    if values.get(spec.name).map_or(true, FieldValue::is_blank) {
                        missing.push(format!("{}[{index}].{}", list.name, spec.name));
                    }
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Required fields are empty: {}",
                missing.join(", ")
            )))
        }
    }

    /// The API payload for the current record.
    pub fn to_wire(&self) -> Value {
        wire::record_to_wire(self.schema, &self.record)
    }

    // ---- private helpers ----

    fn list_spec(&self, list: &str) -> Result<&'static ListSpec, CoreError> {
        self.schema.list(list).ok_or_else(|| CoreError::UnknownField {
            path: list.to_string(),
        })
    }

    fn rows_entry(&self, list: &str) -> Result<(&'static ListSpec, &Vec<Row>), CoreError> {
        let spec = self.list_spec(list)?;
        static NO_ROWS: Vec<Row> = Vec::new();
        Ok((spec, self.record.lists.get(spec.name).unwrap_or(&NO_ROWS)))
    }

    fn rows_entry_mut(
        &mut self,
        list: &str,
    ) -> Result<(&'static ListSpec, &mut Vec<Row>), CoreError> {
        let spec = self.list_spec(list)?;
        Ok((spec, self.record.lists.entry(spec.name).or_default()))
    }

    fn ticket_slot(&mut self, ticket: &UploadTicket) -> Option<&mut UploadSlot> {
        self.record
            .lists
            .get_mut(ticket.list)?
            .iter_mut()
            .find(|row| row.id == ticket.row)
            .and_then(|row| match &mut row.data {
                RowData::Attachment(slot) => Some(slot),
                RowData::Fields(_) => None,
            })
    }

    fn new_row(&mut self, spec: &ListSpec) -> Row {
        self.last_row_id += 1;
        let data = match spec.shape {
            ItemShape::Fields(fields) => RowData::Fields(template_fields(fields, self.today)),
            ItemShape::Attachment => RowData::Attachment(UploadSlot::default()),
        };
        Row {
            id: self.last_row_id,
            data,
        }
    }

    fn pad_lists(&mut self) {
        for spec in self.schema.lists {
            let have = self.record.lists.get(spec.name).map_or(0, Vec::len);
            let missing = spec.policy.seeded_len().saturating_sub(have);
            let new_rows: Vec<Row> = (0..missing).map(|_| self.new_row(spec)).collect();
            self.record.lists.entry(spec.name).or_default().extend(new_rows);
        }
    }
}

fn template_fields(specs: &[FieldSpec], today: NaiveDate) -> Fields {
    specs
        .iter()
        .map(|spec| (spec.name, FieldValue::template(spec.kind, today)))
        .collect()
}

fn find_field<'a>(fields: &'a [FieldSpec], name: &str) -> Option<&'a FieldSpec> {
    fields.iter().find(|f| f.name == name)
}

fn record_id(wire: &Value) -> Option<RecordId> {
    ["_id", "id"].iter().find_map(|key| match wire.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
