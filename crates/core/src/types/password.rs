//! Password policy for login, registration and admin user forms.

use core::fmt;

/// Errors that can occur when validating a [`Password`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The password is shorter than the minimum length.
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The password is longer than the maximum length.
    #[error("password must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A password that satisfies the length policy.
///
/// The value is only ever forwarded to the backend. `Debug` is redacted so
/// the password never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 8;
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 128;

    /// Validate a password.
    ///
    /// Length is counted in characters, not bytes. The input is not trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError`] if the length is outside the policy.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        let len = s.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(PasswordError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Expose the raw password for the outgoing request body.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}
