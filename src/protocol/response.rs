//! GraphQL request and response bodies.
//!
//! The same request shape is used as the HTTP POST body and as the
//! payload of a `start` frame:
//!
//! ```json
//! { "query": "...", "variables": { ... }, "operationName": "..." }
//! ```
//!
//! Responses follow the GraphQL over HTTP convention:
//!
//! ```json
//! { "data": { ... }, "errors": [ { "message": "...", "locations": [ ... ] } ] }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// GraphQLRequest
// ============================================================================

/// A GraphQL operation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// Document source text.
    pub query: String,

    /// Variable values, `{}` when none are given.
    #[serde(default = "empty_variables")]
    pub variables: Value,

    /// Operation to execute when the document holds several.
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    /// Creates a request with no variables.
    #[inline]
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: empty_variables(),
            operation_name: None,
        }
    }

    /// Sets the variables.
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the operation name.
    #[inline]
    #[must_use]
    pub fn with_operation_name(mut self, name: Option<String>) -> Self {
        self.operation_name = name;
        self
    }
}

/// Returns an empty JSON object.
pub(crate) fn empty_variables() -> Value {
    Value::Object(Map::new())
}

// ============================================================================
// GraphQLResponse
// ============================================================================

/// A GraphQL response body.
///
/// A present `errors` key (even an empty array) marks the response as an
/// execution error. Error entries are decoded leniently: a bare string, a
/// `null` field or a malformed location never rejects the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// Result of the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Errors reported by the server.
    #[serde(
        default,
        deserialize_with = "lenient_errors",
        skip_serializing_if = "Option::is_none"
    )]
    pub errors: Option<Vec<GraphQLError>>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLResponse {
    /// Returns `true` if the response carries an `errors` array.
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    /// Returns the reported errors, empty if none.
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[GraphQLError] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Returns all error summaries joined with `; `.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.errors.as_ref().map(|errors| {
            errors
                .iter()
                .map(GraphQLError::summary)
                .collect::<Vec<_>>()
                .join("; ")
        })
    }

    /// Deserializes `data` into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::GraphQL`] if the response carries errors
    /// - [`Error::Json`] if `data` does not match `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        if self.has_errors() {
            return Err(Error::graphql(self.clone()));
        }
        let data = self.data.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

// ============================================================================
// GraphQLError
// ============================================================================

/// One entry of a response's `errors` array.
///
/// Non-standard keys (for example `code` and `error` sent by some servers
/// instead of `message`) are kept in [`GraphQLError::extra`], as are
/// `locations` that do not have the standard shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,

    /// Document locations the error refers to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,

    /// Response path of the failing field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,

    /// Additional error metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,

    /// Any other keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphQLError {
    /// Returns a one-line description.
    ///
    /// Uses `message` when present, otherwise the `[code] at [path]: error`
    /// form.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.message.is_empty() {
            return self.message.clone();
        }

        match self.extra.get("error") {
            Some(error) => format!(
                "[{}] at [{}]: {}",
                display_value(self.extra.get("code")),
                display_value(self.path.as_ref()),
                display_value(Some(error)),
            ),
            None => Value::Object(self.extra.clone()).to_string(),
        }
    }
}

impl From<Value> for GraphQLError {
    fn from(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            Value::String(message) => {
                return Self {
                    message,
                    ..Self::default()
                };
            }
            Value::Null => return Self::default(),
            other => {
                return Self {
                    message: other.to_string(),
                    ..Self::default()
                };
            }
        };

        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let locations = match fields.remove("locations") {
            Some(Value::Null) | None => Vec::new(),
            Some(raw) => match serde_json::from_value::<Vec<GraphQLLocation>>(raw.clone()) {
                Ok(locations) => locations,
                Err(_) => {
                    fields.insert("locations".to_string(), raw);
                    Vec::new()
                }
            },
        };

        let path = fields.remove("path").filter(|path| !path.is_null());
        let extensions = fields.remove("extensions").filter(|ext| !ext.is_null());

        Self {
            message,
            locations,
            path,
            extensions,
            extra: fields,
        }
    }
}

impl<'de> Deserialize<'de> for GraphQLError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Accepts an `errors` array of any entries, a single error, or `null`.
fn lenient_errors<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Vec<GraphQLError>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(entries)) => Some(entries.into_iter().map(GraphQLError::from).collect()),
        Some(single) => Some(vec![GraphQLError::from(single)]),
    })
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())?;
        if !self.locations.is_empty() {
            let locations = self
                .locations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "\n{locations}")?;
        }
        Ok(())
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

// ============================================================================
// GraphQLLocation
// ============================================================================

/// A line/column position in a document (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number.
    pub line: u32,
    /// Column number.
    pub column: u32,
}

impl fmt::Display for GraphQLLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_without_variables_or_name() {
        let request = GraphQLRequest::new("query { a }");
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(body, json!({ "query": "query { a }", "variables": {} }));
    }

    #[test]
    fn test_request_with_variables_and_name() {
        let request = GraphQLRequest::new("query A($x: Int) { a(x: $x) }")
            .with_variables(json!({ "x": 5 }))
            .with_operation_name(Some("A".into()));
        let body = serde_json::to_value(&request).expect("serialize");

        assert_eq!(body["variables"], json!({ "x": 5 }));
        assert_eq!(body["operationName"], json!("A"));
    }

    #[test]
    fn test_success_response() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "a": 1 } })).expect("parse");

        assert!(!response.has_errors());
        assert_eq!(response.error_message(), None);
        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({ "data": { "a": 1 } })
        );
    }

    #[test]
    fn test_error_response_with_locations() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "errors": [{ "message": "boom", "locations": [{ "line": 1, "column": 3 }] }]
        }))
        .expect("parse");

        assert!(response.has_errors());
        assert_eq!(response.error_message().as_deref(), Some("boom"));
        assert_eq!(response.errors()[0].to_string(), "boom\nline: 1, column: 3");
    }

    #[test]
    fn test_empty_errors_array_counts_as_error() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({ "data": null, "errors": [] })).expect("parse");
        assert!(response.has_errors());
    }

    #[test]
    fn test_nonstandard_error_summary() {
        let error: GraphQLError = serde_json::from_value(json!({
            "path": "$.selectionSet.users",
            "error": "field not found",
            "code": "validation-failed"
        }))
        .expect("parse");

        assert_eq!(
            error.summary(),
            "[validation-failed] at [$.selectionSet.users]: field not found"
        );
    }

    #[test]
    fn test_loose_error_entries_are_tolerated() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [
                "boom",
                { "message": null, "locations": null, "code": "x" },
                { "message": "bad spot", "locations": [{ "line": -1 }] }
            ]
        }))
        .expect("parse");

        let errors = response.errors();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].message, "boom");
        assert_eq!(errors[1].message, "");
        assert!(errors[1].locations.is_empty());
        assert_eq!(errors[1].extra.get("code"), Some(&json!("x")));
        assert_eq!(errors[2].message, "bad spot");
        assert!(errors[2].locations.is_empty());
        assert_eq!(errors[2].extra.get("locations"), Some(&json!([{ "line": -1 }])));
    }

    #[test]
    fn test_single_error_object_and_null_errors() {
        let single: GraphQLResponse =
            serde_json::from_value(json!({ "errors": { "message": "one" } })).expect("parse");
        assert_eq!(single.error_message().as_deref(), Some("one"));

        let none: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "a": 1 }, "errors": null })).expect("parse");
        assert!(!none.has_errors());
    }

    #[test]
    fn test_data_as() {
        #[derive(Deserialize)]
        struct Data {
            a: i64,
        }

        let response: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "a": 7 } })).expect("parse");
        let data: Data = response.data_as().expect("typed data");
        assert_eq!(data.a, 7);
    }

    #[test]
    fn test_data_as_with_errors() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({ "errors": [{ "message": "no" }] })).expect("parse");
        let result = response.data_as::<Value>();
        assert!(matches!(result, Err(Error::GraphQL { .. })));
    }
}
