//! Boundary validation for drafts and patches.
//!
//! The store is schema-agnostic; per-collection rules live here and run
//! before any optimistic change is applied. A rejected payload never touches
//! local state or the remote.

use crate::entity::Fields;

/// Per-collection payload rules.
pub trait Validator: Send + Sync {
    /// Check a create payload. `Err` carries a user-facing message.
    fn validate_draft(&self, draft: &Fields) -> Result<(), String>;

    /// Check an update patch. `Err` carries a user-facing message.
    fn validate_patch(&self, patch: &Fields) -> Result<(), String>;
}

/// Accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate_draft(&self, _draft: &Fields) -> Result<(), String> {
        Ok(())
    }

    fn validate_patch(&self, _patch: &Fields) -> Result<(), String> {
        Ok(())
    }
}

/// Requires a set of fields to be present and non-null.
///
/// Drafts must contain every field. Patches may omit them but may not set
/// one to null.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the payload contains all required fields with a value.
    pub fn has_fields(&self, payload: &Fields) -> bool {
        self.missing(payload).is_empty()
    }

    fn missing<'a>(&'a self, payload: &Fields) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| payload.get(f.as_str()).map_or(true, |v| v.is_null()))
            .map(|f| f.as_str())
            .collect()
    }
}

impl Validator for RequiredFields {
    fn validate_draft(&self, draft: &Fields) -> Result<(), String> {
        let missing = self.missing(draft);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required fields: {}", missing.join(", ")))
        }
    }

    fn validate_patch(&self, patch: &Fields) -> Result<(), String> {
        let cleared: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| patch.get(f.as_str()).is_some_and(|v| v.is_null()))
            .map(|f| f.as_str())
            .collect();
        if cleared.is_empty() {
            Ok(())
        } else {
            Err(format!("required fields cannot be cleared: {}", cleared.join(", ")))
        }
    }
}
