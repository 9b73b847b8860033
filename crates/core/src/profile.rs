//! Profile and password forms on the settings screen.

use serde::Serialize;
use validator::Validate;

use crate::error::CoreError;

/// Editable profile fields, sent as a `PATCH` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(equal = 10, message = "Phone number must have 10 digits"))]
    pub phone: String,
}

impl ProfileForm {
    /// Trim inputs and reject anything the server would refuse.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = crate::filters::sanitize_digits(&self.phone, 10);
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
    #[serde(skip)]
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn validated(self) -> Result<Self, CoreError> {
        self.validate()?;
        if self.current_password == self.new_password {
            return Err(CoreError::Validation(
                "New password must differ from the current password".into(),
            ));
        }
        Ok(self)
    }
}
