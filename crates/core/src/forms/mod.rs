//! Schema-driven nested forms.
//!
//! A [`FormSchema`] describes a record as three groups of fields:
//! top-level scalars, nested objects, and variable-length lists. Each list
//! carries an [`ItemShape`] (structured rows or file attachments) and a
//! [`ListPolicy`] that fixes how many rows it starts with and how many it
//! must keep. [`FormController`] is the single generic editor over any
//! schema; the concrete forms live in the submodules.

mod controller;
mod wire;

pub mod infirmary;
pub mod inventory;
pub mod medical_history;

use std::fmt;

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::filters::sanitize_digits;

pub use controller::{FormController, FormMode, FormRecord, Row, RowData, RowId, UploadTicket};
pub use wire::{canonical_timestamp, parse_wire_date, ATTACHMENT_TITLE_KEY, ATTACHMENT_URL_KEY};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Value type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Digits only, sanitised as typed.
    Digits { max_len: usize },
    /// One of a fixed set of options; new rows default to the first.
    Choice(&'static [&'static str]),
    /// Calendar date; new rows default to today.
    Date,
    Flag,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Digits { .. } | FieldKind::Choice(_) => "text",
            FieldKind::Date => "date",
            FieldKind::Flag => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name used by the form (and by [`FieldPath`]).
    pub name: &'static str,
    /// Name used in the API payload.
    pub wire_name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire_name: name,
            kind,
            required: false,
        }
    }

    pub const fn wire(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A nested object field such as a primary care physician block.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectSpec {
    pub name: &'static str,
    pub wire_name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Shape of the rows in a list field.
#[derive(Debug, PartialEq, Eq)]
pub enum ItemShape {
    /// Structured rows built from a fixed field template.
    Fields(&'static [FieldSpec]),
    /// File attachments, each row an upload slot with a title.
    Attachment,
}

/// Row-count rules for a list field.
///
/// Several screens never offer a delete control on the first row. Whether
/// that is a real "keep one" rule is not settled, so each list states its
/// policy explicitly instead of hard-coding either reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPolicy {
    /// Rows that can never be removed below.
    pub min_items: usize,
    /// Template rows a new form starts with.
    pub initial_items: usize,
}

impl ListPolicy {
    /// At least one row, always.
    pub const KEEP_ONE: ListPolicy = ListPolicy {
        min_items: 1,
        initial_items: 1,
    };

    /// Starts with one editable row that may be removed.
    pub const OPTIONAL_ROW: ListPolicy = ListPolicy {
        min_items: 0,
        initial_items: 1,
    };

    /// Starts empty; rows are only added on request.
    pub const ALLOW_EMPTY: ListPolicy = ListPolicy {
        min_items: 0,
        initial_items: 0,
    };

    /// Rows a freshly created or hydrated list is padded to.
    pub fn seeded_len(self) -> usize {
        self.min_items.max(self.initial_items)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListSpec {
    pub name: &'static str,
    pub wire_name: &'static str,
    pub shape: ItemShape,
    pub policy: ListPolicy,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FormSchema {
    pub name: &'static str,
    pub scalars: &'static [FieldSpec],
    pub objects: &'static [ObjectSpec],
    pub lists: &'static [ListSpec],
}

impl FormSchema {
    pub fn scalar(&self, name: &str) -> Option<&'static FieldSpec> {
        self.scalars.iter().find(|f| f.name == name)
    }

    pub fn object(&self, name: &str) -> Option<&'static ObjectSpec> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn list(&self, name: &str) -> Option<&'static ListSpec> {
        self.lists.iter().find(|l| l.name == name)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Flag(bool),
}

impl FieldValue {
    /// Default value for a new row: empty text, first option, today, or false.
    pub fn template(kind: FieldKind, today: NaiveDate) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Digits { .. } => FieldValue::Text(String::new()),
            FieldKind::Choice(options) => {
                FieldValue::Text(options.first().copied().unwrap_or_default().to_string())
            }
            FieldKind::Date => FieldValue::Date(today),
            FieldKind::Flag => FieldValue::Flag(false),
        }
    }

    /// Fit an input value to `kind`, sanitising digit fields.
    pub(crate) fn coerce(self, kind: FieldKind, path: &FieldPath<'_>) -> Result<Self, CoreError> {
        match (kind, self) {
            (FieldKind::Text, v @ FieldValue::Text(_)) => Ok(v),
            (FieldKind::Digits { max_len }, FieldValue::Text(s)) => {
                Ok(FieldValue::Text(sanitize_digits(&s, max_len)))
            }
            (FieldKind::Choice(options), FieldValue::Text(s)) => {
                if options.contains(&s.as_str()) {
                    Ok(FieldValue::Text(s))
                } else {
                    Err(CoreError::InvalidChoice {
                        field: path.to_string(),
                        value: s,
                    })
                }
            }
            (FieldKind::Date, v @ FieldValue::Date(_)) => Ok(v),
            (FieldKind::Flag, v @ FieldValue::Flag(_)) => Ok(v),
            (kind, _) => Err(CoreError::TypeMismatch {
                path: path.to_string(),
                expected: kind.expected(),
            }),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Text that is empty after trimming. Dates and flags are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Address of a single editable value in a form record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath<'a> {
    Scalar(&'a str),
    Object {
        object: &'a str,
        field: &'a str,
    },
    ListItem {
        list: &'a str,
        index: usize,
        field: &'a str,
    },
}

impl fmt::Display for FieldPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Scalar(field) => write!(f, "{field}"),
            FieldPath::Object { object, field } => write!(f, "{object}.{field}"),
            FieldPath::ListItem { list, index, field } => write!(f, "{list}[{index}].{field}"),
        }
    }
}
