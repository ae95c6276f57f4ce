//! Lifecycle rules: which operations a message status permits.

use crate::error::MessageError;
use crate::types::{MessageId, MessageStatus};

/// Mutating operations on an existing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Refine,
    Edit,
    SetStatus,
}

pub fn allowed_operations(status: MessageStatus) -> Vec<Operation> {
    use Operation::*;
    match status {
        MessageStatus::Draft => vec![Refine, Edit, SetStatus],
        MessageStatus::Finalized => vec![SetStatus],
    }
}

/// Validates an operation against the message's current status.
pub fn validate_operation(
    id: MessageId,
    status: MessageStatus,
    operation: Operation,
) -> Result<(), MessageError> {
    if allowed_operations(status).contains(&operation) {
        Ok(())
    } else {
        Err(MessageError::Finalized(id))
    }
}

/// Trimmed, non-empty user input
pub fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, MessageError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(MessageError::EmptyInput { field })
    } else {
        Ok(trimmed)
    }
}
