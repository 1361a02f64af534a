//! Engine errors.
use std::fmt;

use displaydoc::Display;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::spec::ArgumentError;
use crate::spec::OperationKind;

/// Error in the schema or in its wiring to resolvers.
///
/// These are raised while the executor is being built, never while a request runs.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{0}' is already registered
    DuplicateType(String),
    /// unknown type '{0}'
    UnknownType(String),
    /// field '{field}' is declared twice on type '{ty}'
    DuplicateField { ty: String, field: String },
    /// type '{ty}' has no field '{field}'
    UnknownField { ty: String, field: String },
    /// no resolver registered for {kind} field '{field}'
    MissingResolver { kind: OperationKind, field: String },
    /// the schema has no {0} type
    MissingRootType(OperationKind),
    /// GraphQL parser error: {0}
    Parse(ParseErrors),
    /// unsupported schema definition: {0}
    UnsupportedDefinition(String),
}

/// Collection of SDL parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors {
    pub(crate) errors: Vec<String>,
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

/// A failure scoped to one field of the response.
///
/// The field resolves to null and the error is reported next to the data.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("Cannot query field \"{field}\" on type \"{ty}\".")]
    UnknownField { field: String, ty: String },

    #[error("Cannot return null for non-nullable field {ty}.{field}")]
    NullValue { ty: String, field: String },

    #[error("Expected a value of type \"{expected}\" for field {ty}.{field}, got {value}")]
    InvalidOutput {
        ty: String,
        field: String,
        expected: String,
        value: String,
    },

    /// Failure reported by a resolver.
    #[error("{message}")]
    Resolver {
        message: String,
        code: String,
        details: Option<Object>,
    },
}

impl FieldError {
    /// Wraps a domain error raised by a resolver, keeping its message and code.
    pub fn resolver<E>(error: E) -> Self
    where
        E: ErrorExtension + fmt::Display,
    {
        FieldError::Resolver {
            message: error.to_string(),
            code: error.extension_code(),
            details: error.custom_extension_details(),
        }
    }
}

impl ErrorExtension for FieldError {
    fn extension_code(&self) -> String {
        match self {
            FieldError::Argument(error) => error.extension_code(),
            FieldError::UnknownField { .. } => "UNKNOWN_FIELD".to_string(),
            FieldError::NullValue { .. } | FieldError::InvalidOutput { .. } => {
                "RESPONSE_VALIDATION_FAILED".to_string()
            }
            FieldError::Resolver { code, .. } => code.clone(),
        }
    }

    fn custom_extension_details(&self) -> Option<Object> {
        match self {
            FieldError::Argument(error) => error.custom_extension_details(),
            FieldError::UnknownField { field, ty } => {
                let mut obj = Object::new();
                obj.insert("type", ty.clone().into());
                obj.insert("field", field.clone().into());
                Some(obj)
            }
            FieldError::NullValue { .. } | FieldError::InvalidOutput { .. } => None,
            FieldError::Resolver { details, .. } => details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Display)]
    enum TestError {
        /// the answer is not {0}
        NotTheAnswer(u32),
    }

    impl ErrorExtension for TestError {}

    #[test]
    fn resolver_errors_keep_message_and_code() {
        let error = FieldError::resolver(TestError::NotTheAnswer(41));
        assert_eq!(error.to_string(), "the answer is not 41");
        assert_eq!(error.extension_code(), "TEST_ERROR");

        let graphql = error.to_graphql_error(None, Vec::new());
        assert_eq!(graphql.message, "the answer is not 41");
        assert_eq!(graphql.extension_code().as_deref(), Some("TEST_ERROR"));
    }

    #[test]
    fn null_value_message() {
        let error = FieldError::NullValue {
            ty: "CalculationResult".to_string(),
            field: "result".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Cannot return null for non-nullable field CalculationResult.result"
        );
        assert_eq!(error.extension_code(), "RESPONSE_VALIDATION_FAILED");
    }

    #[test]
    fn invalid_output_message() {
        let error = FieldError::InvalidOutput {
            ty: "Query".to_string(),
            field: "total".to_string(),
            expected: "Float".to_string(),
            value: "\"not a number\"".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Expected a value of type \"Float\" for field Query.total, got \"not a number\""
        );
        assert_eq!(error.extension_code(), "RESPONSE_VALIDATION_FAILED");
    }

    #[test]
    fn parse_errors_are_truncated() {
        let errors = ParseErrors {
            errors: (0..7).map(|i| format!("error {i}")).collect(),
        };
        assert_eq!(
            errors.to_string(),
            "error 0\nerror 1\nerror 2\nerror 3\nerror 4\n...and 2 other errors"
        );
    }
}
