use crate::types::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("Unknown filter '{key}'")]
    UnknownFilter { key: String },

    #[error("Invalid value '{value}' for {field}")]
    InvalidChoice { field: String, value: String },

    #[error("Unknown form field '{path}'")]
    UnknownField { path: String },

    #[error("Field '{path}' expects a {expected} value")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("Row {index} does not exist in '{list}' ({len} rows)")]
    IndexOutOfRange {
        list: String,
        index: usize,
        len: usize,
    },

    #[error("'{list}' must keep at least {min} row(s)")]
    MinimumItems { list: String, min: usize },

    #[error("Upload still in progress for '{list}' row {index}")]
    UploadInFlight { list: String, index: usize },
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(validation_message(&errors))
    }
}

/// Flatten `validator` field errors into one line of inline text.
///
/// Fields are sorted so the message is stable between runs. A field
/// error without a custom message falls back to its code.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
