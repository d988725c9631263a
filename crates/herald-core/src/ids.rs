//! Type-safe ID wrappers for Herald.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Characters that turn a command ID into a wildcard pattern.
pub const WILDCARD_CHARS: [char; 2] = ['*', '?'];

/// Macro to generate ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(TaskId);
define_id!(CommandId);
define_id!(InstanceId);
define_id!(NotifierId);

fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl TaskId {
    /// A task ID is well formed when it is non-empty, has no whitespace and
    /// no wildcard characters.
    pub fn is_well_formed(&self) -> bool {
        is_plain_identifier(&self.0) && !self.0.contains(WILDCARD_CHARS)
    }
}

impl CommandId {
    /// A command ID is well formed when it is non-empty and has no whitespace.
    /// Wildcards are allowed.
    pub fn is_well_formed(&self) -> bool {
        is_plain_identifier(&self.0)
    }

    /// Returns true if this ID is a pattern rather than a literal command.
    pub fn is_pattern(&self) -> bool {
        self.0.contains(WILDCARD_CHARS)
    }
}

impl InstanceId {
    /// Creates a new random instance ID.
    pub fn new() -> Self {
        Self(format!("inst-{}", Uuid::new_v4().simple()))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_prefix_and_uniqueness() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        assert!(a.as_str().starts_with("inst-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_task_id_well_formed() {
        assert!(TaskId::from("price-watch").is_well_formed());
        assert!(!TaskId::from("").is_well_formed());
        assert!(!TaskId::from("price watch").is_well_formed());
        assert!(!TaskId::from("price*").is_well_formed());
    }

    #[test]
    fn test_command_id_allows_wildcards() {
        let id = CommandId::from("Watch*");
        assert!(id.is_well_formed());
        assert!(id.is_pattern());
        assert!(!CommandId::from("Watch").is_pattern());
        assert!(!CommandId::from(" ").is_well_formed());
    }

    #[test]
    fn test_id_serialization() {
        let id = TaskId::from_string("task-a");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-a\"");

        let parsed: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
