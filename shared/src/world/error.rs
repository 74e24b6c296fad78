use thiserror::Error;

use crate::types::EntityId;

/// Errors from entity graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("parent {0} does not exist")]
    UnknownParent(EntityId),

    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    #[error("the root group cannot be removed")]
    CannotRemoveRoot,
}
