//! Composite document identifiers.
//!
//! A [`DocumentKey`] addresses one document inside a tenant's index and has
//! the shape `tenant:project:documentType:callerID`. Components are joined
//! with `:` without escaping, so a caller id that itself contains `:` can
//! produce the same key as a different component split. Existing indexes
//! rely on this exact format.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TenantdexError};

const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Validate the components and join them into a key.
    ///
    /// `tenant`, `project` and `document_type` must be non-empty; `caller_id`
    /// must be non-empty after trimming but is embedded as given.
    pub fn build(
        tenant: &str,
        project: &str,
        document_type: &str,
        caller_id: &str,
    ) -> Result<Self> {
        require("tenant code", tenant)?;
        require("project code", project)?;
        require("document type", document_type)?;
        if caller_id.trim().is_empty() {
            return Err(TenantdexError::InvalidArgument(
                "document id is required".to_string(),
            ));
        }

        let mut key = String::with_capacity(
            tenant.len() + project.len() + document_type.len() + caller_id.len() + 3,
        );
        for (i, part) in [tenant, project, document_type, caller_id]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(part);
        }
        Ok(DocumentKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TenantdexError::InvalidArgument(format!(
            "{} is required",
            name
        )));
    }
    Ok(())
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a stored key back, applying the same rules as [`DocumentKey::build`].
/// Everything after the third `:` is the caller id.
impl TryFrom<String> for DocumentKey {
    type Error = TenantdexError;

    fn try_from(raw: String) -> Result<Self> {
        let mut parts = raw.splitn(4, SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(tenant), Some(project), Some(document_type), Some(caller_id)) => {
                DocumentKey::build(tenant, project, document_type, caller_id)
            }
            _ => Err(TenantdexError::InvalidArgument(format!(
                "malformed document key '{}'",
                raw
            ))),
        }
    }
}

impl From<DocumentKey> for String {
    fn from(key: DocumentKey) -> Self {
        key.0
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
