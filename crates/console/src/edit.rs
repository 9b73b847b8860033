//! Command-line editing of nested forms.
//!
//! Edits are given as text: `--add list`, `--set path=value` and
//! `--attach list[index]=file`. Paths use the same notation the form
//! reports in its errors: `field`, `object.field`, `list[index].field`.

use std::sync::Arc;

use carehub_client::error::ClientError;
use carehub_client::form::{FileUpload, FormSession, UploadOutcome};
use carehub_core::error::CoreError;
use carehub_core::forms::infirmary::INFIRMARY_VISIT;
use carehub_core::forms::inventory::INVENTORY_ITEM;
use carehub_core::forms::medical_history::MEDICAL_HISTORY;
use carehub_core::forms::{FieldKind, FieldPath, FieldValue, FormSchema, ItemShape};
use carehub_core::resources::Resource;
use chrono::NaiveDate;

/// Forms the console can create or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormKind {
    MedicalHistory,
    Infirmary,
    Inventory,
}

impl FormKind {
    pub fn schema(self) -> &'static FormSchema {
        match self {
            Self::MedicalHistory => &MEDICAL_HISTORY,
            Self::Infirmary => &INFIRMARY_VISIT,
            Self::Inventory => &INVENTORY_ITEM,
        }
    }

    /// REST collection the form saves into.
    pub fn path(self) -> &'static str {
        match self {
            Self::MedicalHistory => "medical-history",
            Self::Infirmary => Resource::Infirmary.path(),
            Self::Inventory => Resource::Inventory.path(),
        }
    }
}

/// Edits collected from the command line, applied in order: rows are
/// added first, then values set, then files uploaded.
#[derive(Debug, Clone, Default)]
pub struct FormEdits {
    pub add: Vec<String>,
    pub set: Vec<String>,
    pub attach: Vec<String>,
}

fn invalid(message: String) -> CoreError {
    CoreError::Validation(message)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split `list[index]` into its parts.
fn parse_indexed(s: &str) -> Option<(&str, usize)> {
    let (list, rest) = s.split_once('[')?;
    let index = rest.strip_suffix(']')?.parse().ok()?;
    (!list.is_empty()).then_some((list, index))
}

/// Parse `field`, `object.field` or `list[index].field`.
pub fn parse_path(s: &str) -> Result<FieldPath<'_>, CoreError> {
    let bad = || invalid(format!("Invalid field path '{s}'"));

    if s.contains('[') {
        let (head, field) = s.split_once("].").ok_or_else(bad)?;
        let (list, index) = parse_indexed(&s[..=head.len()]).ok_or_else(bad)?;
        if field.is_empty() {
            return Err(bad());
        }
        return Ok(FieldPath::ListItem { list, index, field });
    }

    match s.split_once('.') {
        Some((object, field)) if !object.is_empty() && !field.is_empty() => {
            Ok(FieldPath::Object { object, field })
        }
        Some(_) => Err(bad()),
        None if s.is_empty() => Err(bad()),
        None => Ok(FieldPath::Scalar(s)),
    }
}

/// Kind of the field at `path`, if the schema has one.
fn field_kind(schema: &FormSchema, path: FieldPath<'_>) -> Option<FieldKind> {
    match path {
        FieldPath::Scalar(field) => schema.scalar(field).map(|f| f.kind),
        FieldPath::Object { object, field } => schema
            .object(object)?
            .fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.kind),
        FieldPath::ListItem { list, field, .. } => match &schema.list(list)?.shape {
            ItemShape::Fields(fields) => fields.iter().find(|f| f.name == field).map(|f| f.kind),
            ItemShape::Attachment => (field == "title").then_some(FieldKind::Text),
        },
    }
}

/// Convert raw text into a value of `kind`. Dates are `YYYY-MM-DD`.
pub fn parse_value(kind: FieldKind, raw: &str) -> Result<FieldValue, CoreError> {
    match kind {
        FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| invalid(format!("Invalid date '{raw}', expected YYYY-MM-DD"))),
        FieldKind::Flag => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(FieldValue::Flag(true)),
            "false" | "no" | "0" => Ok(FieldValue::Flag(false)),
            _ => Err(invalid(format!("Invalid flag '{raw}', expected true or false"))),
        },
        FieldKind::Text | FieldKind::Digits { .. } | FieldKind::Choice(_) => {
            Ok(FieldValue::Text(raw.to_string()))
        }
    }
}

/// Parse `path=value` against `schema`.
pub fn parse_assignment<'a>(
    schema: &FormSchema,
    s: &'a str,
) -> Result<(FieldPath<'a>, FieldValue), CoreError> {
    let (path, raw) = s
        .split_once('=')
        .ok_or_else(|| invalid(format!("Expected path=value, got '{s}'")))?;
    let path = parse_path(path)?;
    let kind = field_kind(schema, path).ok_or_else(|| CoreError::UnknownField {
        path: path.to_string(),
    })?;
    Ok((path, parse_value(kind, raw)?))
}

/// Parse `list[index]=file`.
pub fn parse_attachment(s: &str) -> Result<(&str, usize, &str), CoreError> {
    let bad = || invalid(format!("Expected list[index]=file, got '{s}'"));
    let (slot, file) = s.split_once('=').ok_or_else(bad)?;
    let (list, index) = parse_indexed(slot).ok_or_else(bad)?;
    if file.is_empty() {
        return Err(bad());
    }
    Ok((list, index, file))
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// Apply `edits` to an open form session.
///
/// Stops at the first addressing or value error. Upload failures do not
/// stop the run; each one is returned as `(slot, message)` so the caller
/// can decide whether to submit anyway.
pub async fn apply(
    session: &Arc<FormSession>,
    edits: &FormEdits,
) -> Result<Vec<(String, String)>, ClientError> {
    let schema = session.read(|f| f.schema()).await;

    for list in &edits.add {
        let index = session.add_list_item(list).await?;
        tracing::debug!(list = %list, index, "Row added");
    }

    for assignment in &edits.set {
        let (path, value) = parse_assignment(schema, assignment)?;
        session.set_field(path, value).await?;
    }

    let mut failures = Vec::new();
    for attachment in &edits.attach {
        let (list, index, file) = parse_attachment(attachment)?;
        let upload = FileUpload::from_path(file)
            .await
            .map_err(|e| invalid(format!("Cannot read '{file}': {e}")))?;
        match session.attach_file(list, index, upload).await? {
            UploadOutcome::Uploaded { .. } => {}
            UploadOutcome::Failed { message } => failures.push((format!("{list}[{index}]"), message)),
            UploadOutcome::Superseded => {}
        }
    }
    Ok(failures)
}
