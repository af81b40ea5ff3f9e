// SPDX-License-Identifier: MIT
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares an opaque, prefixed identifier newtype over `String`.
///
/// Every id in the conversation engine is globally unique and carries a
/// recognizable prefix (`agent_`, `session_`, ...) so that ids from
/// different record kinds can never be confused for one another even when
/// logged side by side.
macro_rules! prefixed_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, globally-unique id.
            pub fn new() -> Self {
                Self(format!(concat!($prefix, "{}"), Uuid::new_v4()))
            }

            /// Wrap an already-prefixed string (e.g. loaded from storage).
            ///
            /// Does not validate the prefix: callers that need that
            /// guarantee should use [`Self::parse`].
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Parse a string, requiring it to carry this id kind's prefix.
            pub fn parse(raw: &str) -> Option<Self> {
                raw.starts_with($prefix).then(|| Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub const PREFIX: &'static str = $prefix;
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

prefixed_id!(AgentId, "agent_");
prefixed_id!(SessionId, "session_");
prefixed_id!(ImageId, "image_");
prefixed_id!(ContainerId, "container_");
prefixed_id!(MessageId, "msg_");
prefixed_id!(ToolCallId, "call_");
prefixed_id!(EventId, "evt_");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("agent_"));
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        assert!(SessionId::parse("agent_123").is_none());
        assert!(SessionId::parse("session_123").is_some());
    }

    #[test]
    fn display_round_trips_through_from_raw() {
        let id = ImageId::new();
        let text = id.to_string();
        let reparsed = ImageId::from_raw(text.clone());
        assert_eq!(reparsed.as_str(), text);
    }

    #[test]
    fn distinct_kinds_use_distinct_prefixes() {
        assert_eq!(AgentId::PREFIX, "agent_");
        assert_eq!(ToolCallId::PREFIX, "call_");
        assert_eq!(EventId::PREFIX, "evt_");
    }
}
