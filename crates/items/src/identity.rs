use serde::{Deserialize, Serialize};

use crate::error::ItemError;

/// Only accounts under this suffix may use the service.
pub const CAMPUS_EMAIL_DOMAIN: &str = "@iare.ac.in";

/// An authenticated campus user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Admission rule for account emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDomainPolicy {
    suffix: String,
}

impl Default for EmailDomainPolicy {
    fn default() -> Self {
        Self::campus()
    }
}

impl EmailDomainPolicy {
    pub fn campus() -> Self {
        Self::new(CAMPUS_EMAIL_DOMAIN)
    }

    /// `suffix` may be given with or without the leading `@`.
    pub fn new(suffix: &str) -> Self {
        let suffix = suffix.trim().to_ascii_lowercase();
        let suffix = if suffix.starts_with('@') {
            suffix
        } else {
            format!("@{suffix}")
        };
        Self { suffix }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn rejection_message(&self) -> String {
        format!(
            "Access Restricted: Please login with your official {} email.",
            self.suffix
        )
    }

    pub fn check(&self, email: &str) -> Result<(), ItemError> {
        let email = email.trim().to_ascii_lowercase();
        let admitted = email.matches('@').count() == 1
            && email.ends_with(&self.suffix)
            && email.len() > self.suffix.len();
        if admitted {
            Ok(())
        } else {
            Err(ItemError::DomainRejected(self.rejection_message()))
        }
    }

    pub fn admits(&self, email: &str) -> bool {
        self.check(email).is_ok()
    }
}
