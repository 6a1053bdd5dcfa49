//! Error types and the diagnostic log (§7).
//!
//! The teacher defines a single `AttributeError` enum implementing
//! `std::error::Error` for its (much narrower) set of failure modes. We
//! follow the same shape for the one error the calculator is allowed to
//! raise to its caller — a missing attribute descriptor, §7's "metadata
//! error" — and additionally keep a `Diagnostic` log, since §6 requires
//! specific warning strings to be observable by tests rather than just
//! written to whatever global logger is configured.

use crate::ids::AttributeId;
use std::fmt;

/// Raised only when the type DB is missing an [`crate::attribute::AttributeDef`]
/// entirely (§7: "indicates corrupt type DB"). Every other failure mode
/// (malformed modifier, no base value/default, RAH exception) is handled
/// by logging a [`Diagnostic`] and continuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeMetadataError {
    pub attr_id: AttributeId,
}

impl fmt::Display for AttributeMetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no attribute descriptor registered for attribute {}",
            self.attr_id
        )
    }
}

impl std::error::Error for AttributeMetadataError {}

/// Severity of a logged [`Diagnostic`]. The core only ever emits warnings
/// (§6), but the level is carried explicitly so a future diagnostic class
/// doesn't require widening every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
}

/// One entry in a fit's diagnostic log. The message text matches one of
/// §6's stable strings verbatim, so tests can assert on it directly instead
/// of parsing a formatted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn malformed_domain(type_id: crate::ids::ItemTypeId, domain: impl fmt::Display) -> Self {
        Self::warning(format!(
            "malformed modifier on item type {type_id}: unsupported target domain {domain}"
        ))
    }

    pub fn malformed_filter(type_id: crate::ids::ItemTypeId, filter: impl fmt::Display) -> Self {
        Self::warning(format!(
            "malformed modifier on item type {type_id}: invalid target filter {filter}"
        ))
    }

    pub fn rah_exception() -> Self {
        Self::warning("unexpected exception, setting unsimulated resonances")
    }
}
