//! Login credentials type.

use std::fmt;

/// Email and password used to open a session with the backend.
///
/// The password is never exposed in `Debug` output.
///
/// # Example
///
/// ```
/// use commu_core::Credentials;
///
/// let creds = Credentials::new("alice@commu.dev", "hunter2");
/// assert_eq!(creds.email(), "alice@commu.dev");
/// ```
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns the account email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password.
    ///
    /// Only for building the login request body. Never log it.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
