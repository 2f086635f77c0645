// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

/// Name of the input every parameter resource declares.
pub const PARAMETER_VALUE_INPUT: &str = "value";

/// Default applied by deployment tooling when an input is not supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputDefault {
    Value(String),
    Generate {
        #[serde(rename = "minLength")]
        min_length: usize,
    },
}

/// Free-form value (secret or parameter) requested from the deployer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAnnotation {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<InputDefault>,
}

impl InputAnnotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_type: "string".to_string(),
            secret: false,
            default: None,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: InputDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn literal_default(&self) -> Option<&str> {
        match &self.default {
            Some(InputDefault::Value(value)) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_input_with_generated_default() {
        let input = InputAnnotation::new("value")
            .secret()
            .with_default(InputDefault::Generate { min_length: 22 });

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "value",
                "type": "string",
                "secret": true,
                "default": { "generate": { "minLength": 22 } }
            })
        );
    }

    #[test]
    fn test_plain_input_omits_optional_fields() {
        let json = serde_json::to_value(InputAnnotation::new("region")).unwrap();
        assert_eq!(json, json!({ "name": "region", "type": "string" }));
    }
}
