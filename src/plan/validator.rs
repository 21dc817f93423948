//! Plan Validation
//!
//! Checks a parsed plan for mistakes serde cannot catch:
//! - Empty failure and panic messages
//! - Zero run timeout
//! - Empty stop-file paths
//!
//! Empty groups are legal (they succeed immediately) but are reported as
//! warnings.

use log::{debug, warn};

use super::model::{child_id, Node, Plan, ROOT_ID};

/// A problem found in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyFailMessage(String),
    EmptyPanicMessage(String),
    EmptyStopFile(String),
    ZeroTimeout,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFailMessage(id) => write!(f, "Action '{}': fail message is empty", id),
            Self::EmptyPanicMessage(id) => write!(f, "Action '{}': panic message is empty", id),
            Self::EmptyStopFile(id) => write!(f, "Group '{}': stop_file is empty", id),
            Self::ZeroTimeout => write!(f, "timeout_ms must be greater than zero"),
        }
    }
}

/// Validates a whole plan, collecting every problem found.
pub fn validate_plan(plan: &Plan) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if plan.timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    validate_node(&plan.run, ROOT_ID, &mut errors);

    if errors.is_empty() {
        debug!("Plan '{}' passed validation", plan.display_name());
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_node(node: &Node, id: &str, errors: &mut Vec<ValidationError>) {
    match node {
        Node::Fail(message) if message.trim().is_empty() => {
            errors.push(ValidationError::EmptyFailMessage(id.to_string()));
        }
        Node::Panic(message) if message.trim().is_empty() => {
            errors.push(ValidationError::EmptyPanicMessage(id.to_string()));
        }
        Node::Sequential(group) => {
            if group
                .stop_file
                .as_ref()
                .is_some_and(|path| path.as_os_str().is_empty())
            {
                errors.push(ValidationError::EmptyStopFile(id.to_string()));
            }
        }
        _ => {}
    }

    if !node.is_action() && node.children().is_empty() {
        warn!("Group '{}' ({}) has no steps", id, node.kind());
    }

    for (index, child) in node.children().iter().enumerate() {
        validate_node(child, &child_id(id, index + 1), errors);
    }
}
