//! Document parsing and named-operation selection.
//!
//! # Rules
//!
//! | Operations in document | Name given | Result |
//! |------------------------|------------|--------|
//! | 0 (fragments only) | any | kind indeterminate, full document |
//! | 1 | no | that operation's kind, full document |
//! | 1 | matching | that operation's kind, full document |
//! | 1 | not matching | [`Error::NamedOperationNotFound`] |
//! | many | matching | first match in document order, reduced document |
//! | many | missing / not matching | [`Error::NamedOperationNotFound`] |
//!
//! A reduced document holds the selected operation and every fragment
//! definition of the source, in source order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use graphql_parser::query::{Definition, Document, OperationDefinition, parse_query};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Owned GraphQL executable document.
pub type QueryDocument = Document<'static, String>;

// ============================================================================
// OperationKind
// ============================================================================

/// Operation type of a GraphQL definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// `query` or shorthand `{ ... }`.
    Query,
    /// `mutation`.
    Mutation,
    /// `subscription`.
    Subscription,
}

impl OperationKind {
    /// Returns the GraphQL keyword for this kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }

    fn of(operation: &OperationDefinition<'static, String>) -> Self {
        match operation {
            OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => Self::Query,
            OperationDefinition::Mutation(_) => Self::Mutation,
            OperationDefinition::Subscription(_) => Self::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ParsedOperation
// ============================================================================

/// Result of classifying a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOperation {
    /// Kind of the selected operation, `None` when the document has none.
    kind: Option<OperationKind>,
    /// Name of the selected operation.
    name: Option<String>,
    /// Full or reduced document.
    document: QueryDocument,
}

impl ParsedOperation {
    /// Returns the operation kind, `None` if indeterminate.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<OperationKind> {
        self.kind
    }

    /// Returns the selected operation's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the parsed document.
    #[inline]
    #[must_use]
    pub fn document(&self) -> &QueryDocument {
        &self.document
    }

    /// Returns `true` if the selected operation is a subscription.
    #[inline]
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        self.kind == Some(OperationKind::Subscription)
    }

    /// Returns the number of operation definitions in the document.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.document
            .definitions
            .iter()
            .filter(|definition| matches!(definition, Definition::Operation(_)))
            .count()
    }

    /// Renders the document back to GraphQL source text.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.document.to_string()
    }
}

// ============================================================================
// classify
// ============================================================================

/// Parses `text` and selects the operation to execute.
///
/// # Errors
///
/// - [`Error::Parse`] if the text is not a valid executable document
/// - [`Error::NamedOperationNotFound`] if `operation_name` does not select
///   exactly one operation (see module docs)
pub fn classify(text: &str, operation_name: Option<&str>) -> Result<ParsedOperation> {
    let document = parse_query::<String>(text)
        .map_err(|e| Error::parse(e.to_string()))?
        .into_static();

    // (definition index, kind, declared name) for every operation, in order
    let operations: Vec<(usize, OperationKind, Option<String>)> = document
        .definitions
        .iter()
        .enumerate()
        .filter_map(|(index, definition)| match definition {
            Definition::Operation(operation) => Some((
                index,
                OperationKind::of(operation),
                operation_name_of(operation).map(str::to_string),
            )),
            Definition::Fragment(_) => None,
        })
        .collect();

    match operations.as_slice() {
        [] => Ok(ParsedOperation {
            kind: None,
            name: None,
            document,
        }),

        [(_, kind, name)] => {
            if let Some(wanted) = operation_name
                && name.as_deref() != Some(wanted)
            {
                return Err(Error::named_operation_not_found(Some(wanted), text));
            }

            Ok(ParsedOperation {
                kind: Some(*kind),
                name: name.clone(),
                document,
            })
        }

        many => {
            let wanted = operation_name
                .ok_or_else(|| Error::named_operation_not_found(None, text))?;

            let (selected, kind, _) = many
                .iter()
                .find(|(_, _, name)| name.as_deref() == Some(wanted))
                .ok_or_else(|| Error::named_operation_not_found(Some(wanted), text))?;

            let definitions = document
                .definitions
                .into_iter()
                .enumerate()
                .filter(|(index, definition)| {
                    index == selected || matches!(definition, Definition::Fragment(_))
                })
                .map(|(_, definition)| definition)
                .collect();

            Ok(ParsedOperation {
                kind: Some(*kind),
                name: Some(wanted.to_string()),
                document: Document { definitions },
            })
        }
    }
}

/// Returns the declared name of an operation, `None` for anonymous ones.
fn operation_name_of<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

// ============================================================================
// Tests
// ============================================================================
