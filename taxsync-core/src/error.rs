//! Error types for TAXSYNC operations

use crate::{Dimension, EntityType};
use std::fmt;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Delete failed for {entity_type:?} with id {id}: {reason}")]
    DeleteFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors. These indicate caller mistakes and are raised before
/// any I/O happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Argument {field} out of range ({value}): {reason}")]
    OutOfRange {
        field: String,
        value: i64,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Document mirror errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Mirror request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Mirror transport error: {reason}")]
    Transport { reason: String },

    #[error("Invalid response from mirror: {reason}")]
    InvalidResponse { reason: String },

    #[error("Revision conflict on document {id}")]
    Conflict { id: String },

    #[error("Document not found: {id}")]
    NotFound { id: String },
}

/// Per-entry repair faults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepairError {
    /// No snapshot record matched and the pass has no default to fall back on.
    #[error("No {dimension} match for record {record_number}: {reason}")]
    Unresolved {
        dimension: Dimension,
        record_number: i64,
        reason: String,
    },

    #[error("Repair worker panicked: {reason}")]
    WorkerPanicked { reason: String },

    #[error("Repair cancelled before the entry was processed")]
    Cancelled,
}

impl RepairError {
    /// Unresolved faults are tolerated: the entry is kept as-is.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }
}

/// Master error type for all TAXSYNC errors.
#[derive(Debug, Clone, Error)]
pub enum TaxSyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Repair error: {0}")]
    Repair(#[from] RepairError),
}

impl TaxSyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for TAXSYNC operations.
pub type TaxSyncResult<T> = Result<T, TaxSyncError>;

// ============================================================================
// BOUNDARY FAILURES
// ============================================================================

/// A failed public operation, carrying what was being processed.
///
/// Data-access faults never escape a public operation bare; they come back
/// wrapped with the attempted input so callers can inspect it.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct OperationFailure<I: fmt::Debug> {
    pub operation: &'static str,
    pub input: I,
    pub source: TaxSyncError,
}

impl<I: fmt::Debug> OperationFailure<I> {
    pub fn new(operation: &'static str, input: I, source: impl Into<TaxSyncError>) -> Self {
        Self {
            operation,
            input,
            source: source.into(),
        }
    }

    /// Validation failures mean the call itself was malformed.
    pub fn is_validation(&self) -> bool {
        self.source.is_validation()
    }

    pub fn into_input(self) -> I {
        self.input
    }
}

/// Attach the attempted input to a failed result.
pub trait Attempt<T> {
    fn attempting<I: fmt::Debug>(
        self,
        operation: &'static str,
        input: I,
    ) -> Result<T, OperationFailure<I>>;
}

impl<T> Attempt<T> for TaxSyncResult<T> {
    fn attempting<I: fmt::Debug>(
        self,
        operation: &'static str,
        input: I,
    ) -> Result<T, OperationFailure<I>> {
        self.map_err(|source| OperationFailure {
            operation,
            input,
            source,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
