// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Manifest Values
//!
//! Environment variables, command-line arguments, build arguments and
//! connection strings are all [`ManifestValue`]s. A value is either plain
//! JSON data supplied by a callback, or a deferred [`ValueExpression`] whose
//! text is produced only when it is written (publish mode) or resolved
//! against allocated endpoints (run mode).
//!
//! Only strings, booleans and expressions can be written. Any other JSON
//! shape is rejected with [`ValueError::Unsupported`].

use crate::domain::model::ApplicationModel;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unsupported value type '{value_type}'; expected a string, a boolean or an expression")]
    Unsupported { value_type: &'static str },

    #[error("expression '{expression}' cannot be resolved yet")]
    Unresolved { expression: String },
}

/// A value whose text is produced lazily.
pub trait ValueExpression: fmt::Debug + Send + Sync {
    /// Placeholder written into the manifest, e.g. `{api.bindings.http.port}`.
    fn manifest_expression(&self) -> String;

    /// Checked form of [`ValueExpression::manifest_expression`]. Composite
    /// expressions report parts that cannot be written.
    fn try_manifest_expression(&self) -> Result<String, ValueError> {
        Ok(self.manifest_expression())
    }

    /// Concrete value for the run phase, `None` while it is not yet known.
    fn resolve(&self, model: &ApplicationModel) -> Option<String>;
}

#[derive(Debug, Clone)]
pub enum ManifestValue {
    Json(Value),
    Expression(Arc<dyn ValueExpression>),
}

impl ManifestValue {
    pub fn expression(expression: impl ValueExpression + 'static) -> Self {
        Self::Expression(Arc::new(expression))
    }

    /// Text written into the manifest for this value.
    pub fn to_manifest_string(&self) -> Result<String, ValueError> {
        match self {
            Self::Json(Value::String(value)) => Ok(value.clone()),
            Self::Json(Value::Bool(value)) => Ok(value.to_string()),
            Self::Json(other) => Err(ValueError::Unsupported {
                value_type: json_type_name(other),
            }),
            Self::Expression(expression) => expression.try_manifest_expression(),
        }
    }

    /// Concrete text for the run phase.
    pub fn resolve(&self, model: &ApplicationModel) -> Result<String, ValueError> {
        match self {
            Self::Expression(expression) => {
                expression
                    .resolve(model)
                    .ok_or_else(|| ValueError::Unresolved {
                        expression: expression.manifest_expression(),
                    })
            }
            literal => literal.to_manifest_string(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for ManifestValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for ManifestValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<bool> for ManifestValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<Value> for ManifestValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Which part of an allocated endpoint an [`EndpointReference`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointProperty {
    Url,
    Host,
    Port,
    Scheme,
}

impl EndpointProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Host => "host",
            Self::Port => "port",
            Self::Scheme => "scheme",
        }
    }
}

/// `{resource.bindings.endpoint.property}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReference {
    pub resource: String,
    pub endpoint: String,
    pub property: EndpointProperty,
}

impl EndpointReference {
    pub fn new(
        resource: impl Into<String>,
        endpoint: impl Into<String>,
        property: EndpointProperty,
    ) -> Self {
        Self {
            resource: resource.into(),
            endpoint: endpoint.into(),
            property,
        }
    }

    pub fn port(resource: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(resource, endpoint, EndpointProperty::Port)
    }

    pub fn url(resource: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(resource, endpoint, EndpointProperty::Url)
    }
}

impl ValueExpression for EndpointReference {
    fn manifest_expression(&self) -> String {
        format!(
            "{{{}.bindings.{}.{}}}",
            self.resource,
            self.endpoint,
            self.property.as_str()
        )
    }

    fn resolve(&self, model: &ApplicationModel) -> Option<String> {
        let allocated = model
            .resource(&self.resource)?
            .endpoint(&self.endpoint)?
            .allocated_endpoint()?;
        Some(match self.property {
            EndpointProperty::Url => allocated.uri_string,
            EndpointProperty::Host => allocated.address,
            EndpointProperty::Port => allocated.port.to_string(),
            EndpointProperty::Scheme => allocated.uri_scheme,
        })
    }
}

impl From<EndpointReference> for ManifestValue {
    fn from(reference: EndpointReference) -> Self {
        Self::expression(reference)
    }
}

/// `{resource.connectionString}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStringReference {
    pub resource: String,
}

impl ConnectionStringReference {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

impl ValueExpression for ConnectionStringReference {
    fn manifest_expression(&self) -> String {
        format!("{{{}.connectionString}}", self.resource)
    }

    fn resolve(&self, model: &ApplicationModel) -> Option<String> {
        let resource = model.resource(&self.resource)?;
        resource.connection_string()?.resolve(model).ok()
    }
}

impl From<ConnectionStringReference> for ManifestValue {
    fn from(reference: ConnectionStringReference) -> Self {
        Self::expression(reference)
    }
}

/// `{resource.inputs.input}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReference {
    pub resource: String,
    pub input: String,
}

impl InputReference {
    pub fn new(resource: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            input: input.into(),
        }
    }

    /// The `value` input every parameter resource declares.
    pub fn parameter(resource: impl Into<String>) -> Self {
        Self::new(resource, crate::domain::parameter::PARAMETER_VALUE_INPUT)
    }
}

impl ValueExpression for InputReference {
    fn manifest_expression(&self) -> String {
        format!("{{{}.inputs.{}}}", self.resource, self.input)
    }

    fn resolve(&self, model: &ApplicationModel) -> Option<String> {
        model
            .resource(&self.resource)?
            .input(&self.input)?
            .literal_default()
            .map(str::to_string)
    }
}

impl From<InputReference> for ManifestValue {
    fn from(reference: InputReference) -> Self {
        Self::expression(reference)
    }
}

/// Concatenation of literal text and other values, e.g.
/// `Host={db.bindings.tcp.host};Port={db.bindings.tcp.port}`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceExpression {
    parts: Vec<ManifestValue>,
}

impl ReferenceExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ManifestValue::from(text.into()));
        self
    }

    pub fn value(mut self, value: impl Into<ManifestValue>) -> Self {
        self.parts.push(value.into());
        self
    }
}

impl ValueExpression for ReferenceExpression {
    // Unwritable parts show as `{?}`; publishing goes through the checked form.
    fn manifest_expression(&self) -> String {
        self.parts
            .iter()
            .map(|part| part.to_manifest_string().unwrap_or_else(|_| "{?}".to_string()))
            .collect()
    }

    fn try_manifest_expression(&self) -> Result<String, ValueError> {
        self.parts.iter().map(ManifestValue::to_manifest_string).collect()
    }

    fn resolve(&self, model: &ApplicationModel) -> Option<String> {
        self.parts
            .iter()
            .map(|part| part.resolve(model).ok())
            .collect()
    }
}

impl From<ReferenceExpression> for ManifestValue {
    fn from(expression: ReferenceExpression) -> Self {
        Self::expression(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals_and_booleans_are_written_as_text() {
        assert_eq!(ManifestValue::from("redis").to_manifest_string().unwrap(), "redis");
        assert_eq!(ManifestValue::from(true).to_manifest_string().unwrap(), "true");
    }

    #[test]
    fn test_other_json_types_are_rejected() {
        let err = ManifestValue::from(json!(8080)).to_manifest_string().unwrap_err();
        assert_eq!(err, ValueError::Unsupported { value_type: "number" });

        let err = ManifestValue::from(json!(["a"])).to_manifest_string().unwrap_err();
        assert_eq!(err, ValueError::Unsupported { value_type: "array" });
    }

    #[test]
    fn test_expression_placeholders() {
        assert_eq!(
            EndpointReference::port("api", "http").manifest_expression(),
            "{api.bindings.http.port}"
        );
        assert_eq!(
            ConnectionStringReference::new("cache").manifest_expression(),
            "{cache.connectionString}"
        );
        assert_eq!(
            InputReference::parameter("password").manifest_expression(),
            "{password.inputs.value}"
        );
    }

    #[test]
    fn test_reference_expression_concatenates_parts() {
        let expression = ReferenceExpression::new()
            .literal("Host=")
            .value(EndpointReference::new("db", "tcp", EndpointProperty::Host))
            .literal(";Port=")
            .value(EndpointReference::port("db", "tcp"));
        assert_eq!(
            expression.manifest_expression(),
            "Host={db.bindings.tcp.host};Port={db.bindings.tcp.port}"
        );
    }

    #[test]
    fn test_reference_expression_rejects_unsupported_part() {
        let value = ManifestValue::from(
            ReferenceExpression::new().literal("Port=").value(json!(5432)),
        );
        let err = value.to_manifest_string().unwrap_err();
        assert_eq!(err, ValueError::Unsupported { value_type: "number" });
    }

    #[test]
    fn test_unallocated_endpoint_does_not_resolve() {
        let model = ApplicationModel::new("/app");
        let value = ManifestValue::from(EndpointReference::port("api", "http"));
        assert!(matches!(value.resolve(&model), Err(ValueError::Unresolved { .. })));
    }
}
