// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable, named declarative template describing an agent's behavior.
///
/// Registered once at startup (spec §3 "Lifecycle/ownership"); never mutated
/// afterwards. An [`crate::Image`] captures a `Definition` by value at build
/// time so later changes to the registry never retroactively alter an
/// existing conversation's behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Definition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            system_prompt: None,
            model: None,
            parameters: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_set_fields() {
        let d = Definition::new("helper")
            .with_system_prompt("be terse")
            .with_model("claude-sonnet-4-20250514");
        assert_eq!(d.name, "helper");
        assert_eq!(d.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(d.model.as_deref(), Some("claude-sonnet-4-20250514"));
    }

    #[test]
    fn serializes_without_optional_fields() {
        let d = Definition::new("bare");
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("system_prompt"));
        assert!(!json.contains("model"));
    }
}
