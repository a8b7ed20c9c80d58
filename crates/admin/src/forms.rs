//! User and login form validation.
//!
//! Forms deserialize from urlencoded bodies as plain strings, then validate
//! into backend payloads. Errors are kept per field for inline display.

use serde::Deserialize;

use bazaar_core::{Email, Password, UserRole};

use crate::backend::{User, UserPayload};

/// Validation message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field errors for a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    /// Record an error for `field`. Only the first error per field is kept.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether the user form is adding a new account or editing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Add/edit user form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

impl UserForm {
    /// Prefill the edit form from an existing account. The password is
    /// never echoed back.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.to_string(),
            role: user.role.to_string(),
            phone: user.phone.clone().unwrap_or_default(),
            password: String::new(),
        }
    }

    /// Validate into a backend payload.
    ///
    /// A password is required when creating. When editing, a blank password
    /// is left out of the payload so the stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails.
    pub fn validate(&self, mode: FormMode) -> Result<UserPayload, FormErrors> {
        let mut errors = FormErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|_| errors.add("role", "Choose a role"))
            .ok();

        let password = match (mode, self.password.is_empty()) {
            (FormMode::Edit, true) => None,
            (FormMode::Create, true) => {
                errors.add("password", "Password is required");
                None
            }
            (_, false) => Password::parse(&self.password)
                .map_err(|e| errors.add("password", e.to_string()))
                .ok()
                .map(|p| p.expose().to_string()),
        };

        let phone = Some(self.phone.trim())
            .filter(|p| !p.is_empty())
            .map(String::from);

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok(UserPayload {
                name: name.to_string(),
                email,
                role,
                phone,
                password,
            }),
            _ => Err(errors),
        }
    }
}

/// Admin login form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Check that the email is well formed and a password was entered.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails.
    pub fn validate(&self) -> Result<Email, FormErrors> {
        let mut errors = FormErrors::default();
        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        match email {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            role: "admin".to_string(),
            phone: String::new(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_create_requires_password() {
        let mut f = form();
        f.password = String::new();
        let errors = f.validate(FormMode::Create).unwrap_err();
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_edit_with_blank_password_keeps_existing() {
        let mut f = form();
        f.password = String::new();
        let payload = f.validate(FormMode::Edit).unwrap();
        assert_eq!(payload.password, None);
        assert_eq!(payload.name, "Ada");
        assert_eq!(payload.phone, None);
    }

    #[test]
    fn test_short_password_is_rejected_even_on_edit() {
        let mut f = form();
        f.password = "short".to_string();
        assert!(f.validate(FormMode::Edit).unwrap_err().get("password").is_some());
    }

    #[test]
    fn test_invalid_fields_are_all_reported() {
        let f = UserForm {
            name: "  ".to_string(),
            email: "not-an-email".to_string(),
            role: "root".to_string(),
            ..form()
        };
        let errors = f.validate(FormMode::Create).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("role"), Some("Choose a role"));
    }

    #[test]
    fn test_blank_password_is_omitted_but_blank_phone_is_null() {
        let mut f = form();
        f.password = String::new();
        let json = serde_json::to_value(f.validate(FormMode::Edit).unwrap()).unwrap();
        assert_eq!(json["role"], "admin");
        assert!(json.get("password").is_none());
        assert_eq!(json.get("phone"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_login_form() {
        let f = LoginForm {
            email: "ada@example.com".to_string(),
            password: String::new(),
        };
        assert!(f.validate().unwrap_err().get("password").is_some());
    }
}
