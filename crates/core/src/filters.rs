//! Filter schemas and the draft/applied filter holder.
//!
//! Every list screen declares a fixed [`FilterSchema`]. Inputs edit the
//! *draft* copy; only [`FilterState::apply`] and [`FilterState::clear`]
//! touch the *applied* copy, which is the one queries are built from.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::query::CollectionQuery;

/// Date format accepted by date filters.
pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// How a filter input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Free text, trimmed when the query is built.
    Text,
    /// Digits only; non-digits are stripped and the value truncated as typed.
    Digits { max_len: usize },
    /// One of a fixed set of options (or empty for "any").
    Choice(&'static [&'static str]),
    /// Calendar date in `YYYY-MM-DD` form (or empty).
    Date,
}

/// A single filter input on a list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Query parameter name sent to the API.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
}

/// The fixed set of filters a screen exposes.
#[derive(Debug, PartialEq, Eq)]
pub struct FilterSchema {
    pub fields: &'static [FilterField],
}

impl FilterSchema {
    pub fn field(&self, key: &str) -> Option<&FilterField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// The all-empty filter shape for this schema.
    pub fn empty_values(&self) -> FilterValues {
        self.fields
            .iter()
            .map(|f| (f.key.to_string(), String::new()))
            .collect()
    }
}

/// Filter values keyed by parameter name.
pub type FilterValues = BTreeMap<String, String>;

/// Strip every non-digit character and truncate to `max_len` digits.
///
/// ```
/// use carehub_core::filters::sanitize_digits;
/// assert_eq!(sanitize_digits("12a3456789", 6), "123456");
/// assert_eq!(sanitize_digits("ab", 6), "");
/// ```
pub fn sanitize_digits(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(max_len)
        .collect()
}

/// Normalise a raw input value for the given filter kind.
///
/// Digits are sanitised, choices and dates are checked. Text is stored
/// verbatim so the input keeps whatever the user typed.
pub fn normalize_filter_value(field: &FilterField, value: &str) -> Result<String, CoreError> {
    match field.kind {
        FilterKind::Text => Ok(value.to_string()),
        FilterKind::Digits { max_len } => Ok(sanitize_digits(value, max_len)),
        FilterKind::Choice(options) => {
            let trimmed = value.trim();
            if trimmed.is_empty() || options.contains(&trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(CoreError::InvalidChoice {
                    field: field.key.to_string(),
                    value: value.to_string(),
                })
            }
        }
        FilterKind::Date => {
            let trimmed = value.trim();
            if trimmed.is_empty() || NaiveDate::parse_from_str(trimmed, FILTER_DATE_FORMAT).is_ok()
            {
                Ok(trimmed.to_string())
            } else {
                Err(CoreError::Validation(format!(
                    "{} must be a date in YYYY-MM-DD form",
                    field.label
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// State holder
// ---------------------------------------------------------------------------

/// Draft and applied filter values for one list screen.
#[derive(Debug, Clone)]
pub struct FilterState {
    schema: &'static FilterSchema,
    draft: FilterValues,
    applied: FilterValues,
}

impl FilterState {
    pub fn new(schema: &'static FilterSchema) -> Self {
        Self {
            schema,
            draft: schema.empty_values(),
            applied: schema.empty_values(),
        }
    }

    pub fn schema(&self) -> &'static FilterSchema {
        self.schema
    }

    pub fn draft(&self) -> &FilterValues {
        &self.draft
    }

    pub fn applied(&self) -> &FilterValues {
        &self.applied
    }

    /// Edit one draft field. Applied values are untouched.
    ///
    /// Returns the value as stored, which may differ from the input for
    /// digit-only fields.
    pub fn set_draft_field(&mut self, key: &str, value: &str) -> Result<&str, CoreError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| CoreError::UnknownFilter {
                key: key.to_string(),
            })?;
        let normalized = normalize_filter_value(field, value)?;
        let slot = self.draft.entry(field.key.to_string()).or_default();
        *slot = normalized;
        Ok(slot.as_str())
    }

    /// Commit the draft. Returns `true` when the applied values changed.
    pub fn apply(&mut self) -> bool {
        if self.draft == self.applied {
            return false;
        }
        self.applied = self.draft.clone();
        true
    }

    /// Reset both copies to the empty shape. Returns `true` when the
    /// applied values changed.
    pub fn clear(&mut self) -> bool {
        let empty = self.schema.empty_values();
        self.draft = empty.clone();
        if self.applied == empty {
            return false;
        }
        self.applied = empty;
        true
    }

    /// Whether the draft holds edits that have not been applied.
    pub fn is_dirty(&self) -> bool {
        self.draft != self.applied
    }

    /// Build the query for `page` from the applied values only.
    ///
    /// Blank and whitespace-only values are left out entirely, so two
    /// applied states that differ only in blanks produce equal queries.
    pub fn to_query(&self, page: u32, limit: u32) -> CollectionQuery {
        let mut query = CollectionQuery::new(page, limit);
        for (key, value) in &self.applied {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                query.filters.insert(key.clone(), trimmed.to_string());
            }
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    static SCHEMA: FilterSchema = FilterSchema {
        fields: &[
            FilterField { key: "name", label: "Name", kind: FilterKind::Text },
            FilterField { key: "pincode", label: "Pincode", kind: FilterKind::Digits { max_len: 6 } },
            FilterField {
                key: "status",
                label: "Status",
                kind: FilterKind::Choice(&["active", "inactive"]),
            },
            FilterField { key: "date", label: "Date", kind: FilterKind::Date },
        ],
    };

    #[test]
    fn pincode_input_strips_non_digits_and_truncates() {
        let mut state = FilterState::new(&SCHEMA);
        let stored = state.set_draft_field("pincode", "12a3456789").unwrap().to_string();
        assert_eq!(stored, "123456");
        assert_eq!(state.draft()["pincode"], "123456");
    }

    #[test]
    fn draft_edits_leave_applied_untouched() {
        let mut state = FilterState::new(&SCHEMA);
        state.set_draft_field("name", "Rao").unwrap();

        assert_eq!(state.applied()["name"], "");
        assert!(state.is_dirty());
        assert!(state.to_query(1, 10).filters.is_empty());
    }

    #[test]
    fn apply_copies_draft_verbatim() {
        let mut state = FilterState::new(&SCHEMA);
        state.set_draft_field("name", "  Rao ").unwrap();

        assert!(state.apply());
        assert_eq!(state.applied()["name"], "  Rao ");
        assert!(!state.is_dirty());
        assert!(!state.apply(), "second apply without edits changes nothing");
    }

    #[test]
    fn query_trims_and_omits_blank_values() {
        let mut state = FilterState::new(&SCHEMA);
        state.set_draft_field("name", "  Rao ").unwrap();
        state.set_draft_field("status", "").unwrap();
        state.apply();

        let query = state.to_query(1, 10);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters["name"], "Rao");
    }

    #[test]
    fn clear_resets_both_copies() {
        let mut state = FilterState::new(&SCHEMA);
        state.set_draft_field("status", "active").unwrap();
        state.apply();
        state.set_draft_field("name", "pending edit").unwrap();

        assert!(state.clear());
        assert_eq!(state.draft(), &SCHEMA.empty_values());
        assert_eq!(state.applied(), &SCHEMA.empty_values());
        assert!(!state.clear(), "clearing an empty state changes nothing");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut state = FilterState::new(&SCHEMA);
        assert_matches!(
            state.set_draft_field("colour", "red"),
            Err(CoreError::UnknownFilter { key }) if key == "colour"
        );
    }

    #[test]
    fn choice_must_be_a_known_option() {
        let mut state = FilterState::new(&SCHEMA);
        assert_matches!(
            state.set_draft_field("status", "archived"),
            Err(CoreError::InvalidChoice { .. })
        );
        assert!(state.set_draft_field("status", " active ").is_ok());
        assert_eq!(state.draft()["status"], "active");
    }

    #[test]
    fn date_must_parse() {
        let mut state = FilterState::new(&SCHEMA);
        assert_matches!(
            state.set_draft_field("date", "31/01/2024"),
            Err(CoreError::Validation(_))
        );
        assert!(state.set_draft_field("date", "2024-01-31").is_ok());
        assert!(state.set_draft_field("date", "").is_ok());
    }
}
