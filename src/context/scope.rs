//! Transactional scope handle.

use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::BoxError;

/// A unit of work boundary owned by the persistence layer.
///
/// The context only attaches and hands back the handle; it never calls
/// these methods itself.
pub trait TransactionScope: Debug + Send + Sync {
    /// Always-run cleanup. Rolls back if `commit` was not called.
    fn complete(&self);

    /// Mark the unit of work as successful.
    fn commit(&self) -> Result<(), BoxError>;
}

/// Shared reference to the current scope.
pub type ScopeHandle = Arc<dyn TransactionScope>;
