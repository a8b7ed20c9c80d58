//! Form parsing and field validation.
//!
//! Each form deserializes from the urlencoded body as plain strings and
//! then validates into the typed value the backend expects. Errors are
//! collected per field so the page can re-render with inline messages.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use bazaar_core::{Email, Password, PaymentMethod};

use crate::backend::BillingDetails;

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

    /// The error message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every recorded error, in field order.
    #[must_use]
    pub fn all(&self) -> &[FieldError] {
        &self.0
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn required(errors: &mut FormErrors, field: &'static str, label: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required"));
    }
    trimmed.to_string()
}

// =============================================================================
// Auth Forms
// =============================================================================

/// Login form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Local path to return to after logging in.
    #[serde(default)]
    pub next: Option<String>,
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
            Some(email) => errors.into_result(email),
            None => Err(errors),
        }
    }
}

/// Registration form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

/// A validated registration.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: Password,
}

impl RegisterForm {
    /// Validate name, email format, password length and confirmation.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails.
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::default();
        let name = required(&mut errors, "name", "Name", &self.name);
        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let password = Password::parse(&self.password)
            .map_err(|e| errors.add("password", e.to_string()))
            .ok();
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match");
        }

        match (email, password) {
            (Some(email), Some(password)) => errors.into_result(Registration {
                name,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Checkout Form
// =============================================================================

/// Billing and payment form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiry: String,
    #[serde(default)]
    pub card_cvv: String,
}

impl CheckoutForm {
    /// Validate billing fields and, for card payments, the card fields.
    ///
    /// `today` decides whether the card has expired. Only the last four card
    /// digits survive into the returned [`BillingDetails`].
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails.
    pub fn validate(&self, today: NaiveDate) -> Result<BillingDetails, FormErrors> {
        let mut errors = FormErrors::default();

        let full_name = required(&mut errors, "full_name", "Full name", &self.full_name);
        let email = match Email::parse(&self.email) {
            Ok(email) => email.into_inner(),
            Err(e) => {
                errors.add("email", e.to_string());
                String::new()
            }
        };
        let phone = required(&mut errors, "phone", "Phone", &self.phone);
        if !phone.is_empty() && !is_valid_phone(&phone) {
            errors.add("phone", "Phone number is invalid");
        }
        let address = required(&mut errors, "address", "Address", &self.address);
        let city = required(&mut errors, "city", "City", &self.city);
        let postal_code = required(&mut errors, "postal_code", "Postal code", &self.postal_code);
        if !postal_code.is_empty() && !is_valid_postal_code(&postal_code) {
            errors.add("postal_code", "Postal code is invalid");
        }
        let country = required(&mut errors, "country", "Country", &self.country);

        let payment_method = self.payment_method.parse::<PaymentMethod>().unwrap_or_else(|_| {
            errors.add("payment_method", "Choose a payment method");
            PaymentMethod::default()
        });

        let card_last4 = if payment_method == PaymentMethod::Card {
            self.validate_card(today, &mut errors)
        } else {
            None
        };

        errors.into_result(BillingDetails {
            full_name,
            email,
            phone,
            address,
            city,
            postal_code,
            country,
            payment_method,
            card_last4,
        })
    }

    fn validate_card(&self, today: NaiveDate, errors: &mut FormErrors) -> Option<String> {
        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();

        let mut last4 = None;
        if digits.is_empty() {
            errors.add("card_number", "Card number is required");
        } else if !(13..=19).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
            || !luhn_valid(&digits)
        {
            errors.add("card_number", "Card number is invalid");
        } else {
            last4 = digits.get(digits.len() - 4..).map(str::to_string);
        }

        match parse_expiry(&self.card_expiry) {
            None => errors.add("card_expiry", "Expiry must be MM/YY"),
            Some((year, month)) if (year, month) < (today.year(), today.month()) => {
                errors.add("card_expiry", "Card has expired");
            }
            Some(_) => {}
        }

        let cvv = self.card_cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            errors.add("card_cvv", "CVV must be 3 or 4 digits");
        }

        last4
    }

    /// Copy of the form safe to render back: card fields are blanked.
    #[must_use]
    pub fn without_card(&self) -> Self {
        Self {
            card_number: String::new(),
            card_expiry: String::new(),
            card_cvv: String::new(),
            ..self.clone()
        }
    }

    /// Whether the card fields should be shown.
    #[must_use]
    pub fn is_card(&self) -> bool {
        self.payment_method != "cash_on_delivery"
    }
}

/// Luhn checksum over an all-digit string.
fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Parse `MM/YY` into a (four digit year, month) pair.
fn parse_expiry(raw: &str) -> Option<(i32, u32)> {
    let (month, year) = raw.trim().split_once('/')?;
    let (month, year) = (month.trim(), year.trim());
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(month) || !two_digits(year) {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    (1..=12).contains(&month).then_some((2000 + year, month))
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (7..=15).contains(&digits)
}

fn is_valid_postal_code(code: &str) -> bool {
    (3..=10).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn valid_checkout() -> CheckoutForm {
        CheckoutForm {
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+1 (555) 010-0000".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            payment_method: "card".to_string(),
            card_number: "4242 4242 4242 4242".to_string(),
            card_expiry: "12/27".to_string(),
            card_cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_valid_card_checkout_keeps_last4_only() {
        let billing = valid_checkout().validate(today()).unwrap();
        assert_eq!(billing.card_last4.as_deref(), Some("4242"));
        assert_eq!(billing.payment_method, PaymentMethod::Card);
        let json = serde_json::to_string(&billing).unwrap();
        assert!(!json.contains("4242 4242"));
        assert!(!json.contains("123\""));
    }

    #[test]
    fn test_cash_on_delivery_skips_card_fields() {
        let form = CheckoutForm {
            payment_method: "cash_on_delivery".to_string(),
            card_number: String::new(),
            card_expiry: String::new(),
            card_cvv: String::new(),
            ..valid_checkout()
        };
        let billing = form.validate(today()).unwrap();
        assert_eq!(billing.card_last4, None);
        assert!(!form.is_card());
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let errors = CheckoutForm::default().validate(today()).unwrap_err();
        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("address"), Some("Address is required"));
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("payment_method"), Some("Choose a payment method"));
    }

    #[test]
    fn test_card_checks() {
        let form = CheckoutForm {
            card_number: "4242 4242 4242 4241".to_string(),
            card_expiry: "09/26".to_string(),
            card_cvv: "12".to_string(),
            ..valid_checkout()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.get("card_number"), Some("Card number is invalid"));
        assert_eq!(errors.get("card_expiry"), Some("Card has expired"));
        assert_eq!(errors.get("card_cvv"), Some("CVV must be 3 or 4 digits"));
    }

    #[test]
    fn test_expiry_in_current_month_is_valid() {
        let form = CheckoutForm {
            card_expiry: "10/26".to_string(),
            ..valid_checkout()
        };
        assert!(form.validate(today()).is_ok());
        assert_eq!(parse_expiry("13/26"), None);
        assert_eq!(parse_expiry("1/26"), None);
    }

    #[test]
    fn test_expiry_parts_must_be_digits() {
        assert_eq!(parse_expiry("+1/27"), None);
        assert_eq!(parse_expiry("12/+7"), None);
        assert_eq!(parse_expiry(" 03 / 28 "), Some((2028, 3)));
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4242424242424242"));
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
    }

    #[test]
    fn test_without_card_blanks_card_fields() {
        let redacted = valid_checkout().without_card();
        assert!(redacted.card_number.is_empty());
        assert!(redacted.card_cvv.is_empty());
        assert_eq!(redacted.full_name, "Jane Doe");
    }

    #[test]
    fn test_login_rejects_malformed_email() {
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: String::new(),
            next: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_register_rejects_short_password() {
        let form = RegisterForm {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "short".to_string(),
            password_confirm: "short".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("password"),
            Some("password must be at least 8 characters")
        );
    }

    #[test]
    fn test_register_checks_confirmation() {
        let form = RegisterForm {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct horse".to_string(),
            password_confirm: "battery staple".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match"));
        assert_eq!(errors.all().len(), 1);
    }

    #[test]
    fn test_register_valid() {
        let form = RegisterForm {
            name: "  Jane ".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
        };
        let registration = form.validate().unwrap();
        assert_eq!(registration.name, "Jane");
        assert_eq!(registration.email.as_str(), "jane@example.com");
    }
}
