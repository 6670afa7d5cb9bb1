use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TenantdexError};
use crate::key::DocumentKey;

/// Tenant identifier; the isolation key. One index per tenant.
pub type TenantId = String;

/// A fully-populated document as handed to the index engine.
///
/// `id` is always derived by [`DocumentKey::build`]; the tenant, project and
/// document type are copied from the request path, never from the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentKey,
    pub project_code: String,
    pub document_type: String,
    pub tenant_code: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub project_code: String,
    pub document_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Hits ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub max_score: f32,
    pub took_ms: u64,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.hits.iter().any(|h| h.id == id)
    }
}

/// Maximum edit distance tolerated between a query term and an indexed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fuzziness(u8);

impl Fuzziness {
    pub const MAX: u8 = 2;

    pub fn distance(self) -> u8 {
        self.0
    }

    fn out_of_range() -> TenantdexError {
        TenantdexError::InvalidArgument(format!(
            "fuzziness must be an integer between 0 and {}",
            Self::MAX
        ))
    }
}

impl Default for Fuzziness {
    fn default() -> Self {
        Fuzziness(1)
    }
}

impl fmt::Display for Fuzziness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Fuzziness {
    type Error = TenantdexError;

    fn try_from(value: i64) -> Result<Self> {
        match u8::try_from(value) {
            Ok(d) if d <= Self::MAX => Ok(Fuzziness(d)),
            _ => Err(Self::out_of_range()),
        }
    }
}

impl TryFrom<i32> for Fuzziness {
    type Error = TenantdexError;

    fn try_from(value: i32) -> Result<Self> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<u8> for Fuzziness {
    type Error = TenantdexError;

    fn try_from(value: u8) -> Result<Self> {
        Self::try_from(i64::from(value))
    }
}

impl FromStr for Fuzziness {
    type Err = TenantdexError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s.trim().parse().map_err(|_| Self::out_of_range())?;
        Self::try_from(value)
    }
}

impl TryFrom<&str> for Fuzziness {
    type Error = TenantdexError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}
