//! Authenticated client identity as returned by the remote CRM.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Person type
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the client is a natural person or an organization.
///
/// The distinction follows the taxpayer identifier: an 11-digit document
/// (CPF) belongs to an individual, a 14-digit one (CNPJ) to an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Individual,
    Organization,
}

impl PersonType {
    /// Infer the person type from a document's digit count.
    ///
    /// Returns `None` for lengths that match neither identifier format. This
    /// is a formatting hint for collaborators, not validation; the document
    /// itself is carried as an opaque login identifier.
    pub fn from_document(document: &str) -> Option<Self> {
        match document.chars().filter(|c| c.is_ascii_digit()).count() {
            11 => Some(Self::Individual),
            14 => Some(Self::Organization),
            _ => None,
        }
    }
}

impl core::fmt::Display for PersonType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PersonType::Individual => write!(f, "individual"),
            PersonType::Organization => write!(f, "organization"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// The identity half of an authenticated session.
///
/// Identifiers are assigned by the remote CRM; this core never mints them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub document: String,
    pub person_type: PersonType,
}

/// Strip everything but ASCII digits from a CPF/CNPJ, matching what the
/// remote authentication service expects on the wire.
pub fn normalize_document(document: &str) -> String {
    document.chars().filter(|c| c.is_ascii_digit()).collect()
}
