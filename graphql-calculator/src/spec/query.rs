//! Query document parsing.
//!
//! A [`Query`] holds every operation of a document. Executing a request first selects one of
//! them with [`Query::operation`], then validates the request variables against it.

use apollo_parser::cst;
use apollo_parser::Parser;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::selection::merge_selections;
use crate::spec::selection::parse_value;
use crate::spec::FieldType;
use crate::spec::Selection;
use crate::spec::SpecError;

/// The kind of an operation, also naming its root type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub const fn root_type_name(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.root_type_name())
    }
}

/// A parsed GraphQL document.
#[derive(Debug, Clone)]
pub struct Query {
    operations: Vec<Operation>,
}

impl Query {
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn parse(query: &str, max_depth: usize) -> Result<Self, SpecError> {
        let tree = Parser::new(query).parse();

        // Return the first parse error, as the rest of the document cannot be trusted
        if let Some(error) = tree.errors().next() {
            return Err(SpecError::ParsingError(error.message().to_string()));
        }

        let operations = tree
            .document()
            .definitions()
            .map(|definition| match definition {
                cst::Definition::OperationDefinition(operation) => {
                    Operation::from_cst(operation, query, max_depth)
                }
                cst::Definition::FragmentDefinition(_) => Err(SpecError::FragmentsNotSupported),
                _ => Err(SpecError::ParsingError(
                    "type system definitions are not allowed in an executable document"
                        .to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if operations.is_empty() {
            return Err(SpecError::ParsingError(
                "the document does not contain any operation".to_string(),
            ));
        }

        Ok(Query { operations })
    }

    /// Selects the operation to execute.
    ///
    /// Without a name, the document must contain a single operation.
    pub fn operation(&self, operation_name: Option<&str>) -> Result<&Operation, SpecError> {
        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None => match self.operations.as_slice() {
                [operation] => Ok(operation),
                _ => Err(SpecError::OperationNameRequired),
            },
        }
    }
}

/// One operation of a document.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub selection_set: Vec<Selection>,
    pub variables: IndexMap<String, (FieldType, Option<Value>)>,
}

impl Operation {
    // Spec: https://spec.graphql.org/draft/#sec-Language.Operations
    fn from_cst(
        operation: cst::OperationDefinition,
        source: &str,
        max_depth: usize,
    ) -> Result<Self, SpecError> {
        let name = operation.name().map(|x| x.text().to_string());

        let kind = match operation.operation_type() {
            None => OperationKind::Query,
            Some(op) if op.query_token().is_some() => OperationKind::Query,
            Some(op) if op.mutation_token().is_some() => OperationKind::Mutation,
            Some(_) => return Err(SpecError::SubscriptionNotSupported),
        };

        if operation.directives().is_some() {
            return Err(SpecError::DirectivesNotSupported);
        }

        let selection_set = operation
            .selection_set()
            .ok_or_else(|| {
                SpecError::ParsingError(
                    "the node SelectionSet is not optional in the spec; qed".to_string(),
                )
            })?
            .selections()
            .map(|selection| Selection::from_cst(selection, source, 1, max_depth))
            .collect::<Result<Vec<_>, _>>()
            .and_then(merge_selections)?;

        let variables = operation
            .variable_definitions()
            .iter()
            .flat_map(|x| x.variable_definitions())
            .map(|definition| {
                let name = definition
                    .variable()
                    .and_then(|variable| variable.name())
                    .ok_or_else(|| {
                        SpecError::ParsingError(
                            "the node Variable is not optional in the spec; qed".to_string(),
                        )
                    })?
                    .text()
                    .to_string();
                let ty = FieldType::try_from(definition.ty().ok_or_else(|| {
                    SpecError::ParsingError(
                        "the node Type is not optional in the spec; qed".to_string(),
                    )
                })?)?;
                let default_value = definition
                    .default_value()
                    .and_then(|v| v.value())
                    .and_then(|value| parse_value(&value));

                Ok((name, (ty, default_value)))
            })
            .collect::<Result<_, SpecError>>()?;

        Ok(Operation {
            name,
            kind,
            selection_set,
            variables,
        })
    }

    /// Validates the request variables against the variable definitions.
    ///
    /// Returns the coerced variables, with defaults applied for the absent ones.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn validate_variables(&self, variables: &Object) -> Result<Object, Vec<SpecError>> {
        let unknown_variables = variables
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !self.variables.contains_key(*k))
            .collect::<Vec<_>>();
        if !unknown_variables.is_empty() {
            failfast_debug!(
                "Received variable unknown to the query: {:?}",
                unknown_variables,
            );
        }

        let mut coerced = Object::new();
        let mut errors = Vec::new();
        for (name, (ty, default_value)) in &self.variables {
            let value = match (variables.get(name.as_str()), default_value) {
                (Some(value), _) => value,
                (None, Some(default_value)) => default_value,
                // an absent nullable variable stays absent
                (None, None) if !ty.is_non_null() => continue,
                (None, None) => &Value::Null,
            };
            match ty.coerce_input_value(value) {
                Ok(value) => {
                    coerced.insert(name.as_str(), value);
                }
                Err(_) => errors.push(SpecError::InvalidVariable(name.clone())),
            }
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    fn object(value: Value) -> Object {
        match value {
            Value::Object(object) => object,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn anonymous_query() {
        let query = Query::parse("{ history { id } }", 64).unwrap();
        let operation = query.operation(None).unwrap();
        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.name, None);
        assert_eq!(operation.selection_set.len(), 1);
        assert_eq!(operation.selection_set[0].name, "history");
    }

    #[test]
    fn root_fields_are_merged_by_response_key() {
        let query = Query::parse(
            r#"{
              calculate(a: 1, b: 2, operation: "ADD") { id }
              calculate(a: 1, b: 2, operation: "ADD") { result }
              history { id }
            }"#,
            64,
        )
        .unwrap();
        let operation = query.operation(None).unwrap();
        assert_eq!(operation.selection_set.len(), 2);
        assert_eq!(
            operation.selection_set[0]
                .selection_set
                .iter()
                .flatten()
                .map(Selection::response_key)
                .collect::<Vec<_>>(),
            ["id", "result"]
        );

        assert_eq!(
            Query::parse("{ total: calculate(a: 1) total: history }", 64).unwrap_err(),
            SpecError::FieldsConflict("total".to_string())
        );
    }

    #[test]
    fn operation_selection_by_name() {
        let query = Query::parse(
            "query History { history { id } } mutation Clear { clearHistory }",
            64,
        )
        .unwrap();
        assert_eq!(
            query.operation(Some("Clear")).unwrap().kind,
            OperationKind::Mutation
        );
        assert_eq!(
            query.operation(None).unwrap_err(),
            SpecError::OperationNameRequired
        );
        assert_eq!(
            query.operation(Some("Missing")).unwrap_err(),
            SpecError::UnknownOperation("Missing".to_string())
        );
        assert_eq!(
            SpecError::UnknownOperation("Missing".to_string()).to_string(),
            "Unknown operation named \"Missing\""
        );
    }

    #[test]
    fn malformed_documents() {
        assert!(matches!(
            Query::parse("{ calculate(a: 1", 64),
            Err(SpecError::ParsingError(_))
        ));
        assert_eq!(
            Query::parse("subscription { history { id } }", 64).unwrap_err(),
            SpecError::SubscriptionNotSupported
        );
        assert_eq!(
            Query::parse("{ ...F } fragment F on Query { clearHistory }", 64).unwrap_err(),
            SpecError::FragmentsNotSupported
        );
        assert!(matches!(
            Query::parse("type Query { a: Int }", 64),
            Err(SpecError::ParsingError(_))
        ));
    }

    #[test]
    fn variables_are_coerced_with_defaults() {
        let query = Query::parse(
            "query Q($a: Float!, $b: Float = 2, $op: String, $limit: Int) { f }",
            64,
        )
        .unwrap();
        let operation = query.operation(Some("Q")).unwrap();

        let coerced = operation
            .validate_variables(&object(json!({ "a": 1, "op": "add" })))
            .unwrap();
        assert_eq!(
            Value::Object(coerced),
            json!({ "a": 1.0, "b": 2.0, "op": "add" })
        );

        let errors = operation
            .validate_variables(&object(json!({ "a": "one", "limit": 1.5 })))
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                SpecError::InvalidVariable("a".to_string()),
                SpecError::InvalidVariable("limit".to_string())
            ]
        );

        let errors = operation.validate_variables(&Object::new()).unwrap_err();
        assert_eq!(errors, vec![SpecError::InvalidVariable("a".to_string())]);
    }
}
