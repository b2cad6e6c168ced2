//! Reader diagnostics: structured errors plus accumulated warnings.

use thiserror::Error;

use crate::sdf;

const TAG: &str = "[USDC]";

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reconstructing a stage from decoded crate tables.
///
/// Fatal: each aborts the current node and surfaces through the driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invariant breach that indicates a reader bug or corrupt tables.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{what} index {index} out of range, must be within [0, {size})")]
    TableBounds {
        what: &'static str,
        index: usize,
        size: usize,
    },

    #[error("multiple specs claim path index {0}")]
    DuplicatePathIndex(u32),

    #[error("fieldset {0} must exist in live fieldsets")]
    MissingFieldSet(u32),

    #[error("`{field}` field must be type `{expected}`, but got type `{got}`")]
    FieldTypeMismatch {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("`typeName` field is missing")]
    MissingTypeName,

    #[error("`specifier` field is missing for a Prim spec")]
    MissingSpecifier,

    #[error("invalid `specifier` value")]
    InvalidSpecifier,

    #[error("invalid token `{token}` for {what}")]
    InvalidEnumToken { what: &'static str, token: String },

    #[error("`{what}` must be within [{min}, {max}], but got {value}")]
    OutOfRange {
        what: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("fieldset holds more than {0} field-value pairs")]
    OversizedFieldSet(usize),

    #[error("prim hierarchy is deeper than {0} levels")]
    DepthExceeded(u32),

    #[error("list-op mixes multiple list-edit qualifiers")]
    ListOpMultiQualifier,

    #[error("unsupported list-op: {0}")]
    ListOpUnsupported(String),

    #[error("unsupported spec type `{0}`")]
    UnsupportedSpecType(sdf::SpecType),

    /// A schema-level reconstruct rejected its property map.
    #[error("failed to reconstruct `{type_name}` prim: {message}")]
    Schema { type_name: String, message: String },

    /// The byte-decoding phase failed before reconstruction started.
    #[error("crate decode failed: {0}")]
    Decode(String),
}

/// Accumulates errors and warnings in a stable order.
///
/// The public contract is two flat strings; the structured list is kept
/// internally and rendered on demand.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
    warnings: Vec<String>,
}

impl Diagnostics {
    /// Record a fatal error.
    pub fn record_error(&mut self, error: &Error) {
        log::debug!("{TAG} error: {error}");
        self.errors.push(error.clone());
    }

    /// Record a non-fatal anomaly; reconstruction proceeds.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{TAG} {message}");
        self.warnings.push(message);
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// All recorded errors as one tagged string.
    pub fn error_string(&self) -> String {
        render(self.errors.iter())
    }

    /// All recorded warnings as one tagged string.
    pub fn warning_string(&self) -> String {
        render(self.warnings.iter())
    }
}

fn render<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| format!("{TAG} {}\n", item.to_string()))
        .collect::<Vec<_>>()
        .concat()
}
