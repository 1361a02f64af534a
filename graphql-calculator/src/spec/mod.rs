//! GraphQL documents and type system: the schema registry, operations and argument coercion.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub(crate) mod arguments;
mod field_type;
pub(crate) mod query;
pub(crate) mod schema;
mod selection;

pub use arguments::ArgumentError;
pub use arguments::Arguments;
use displaydoc::Display;
pub(crate) use field_type::InvalidValue;
pub use field_type::FieldType;
pub use query::Operation;
pub use query::OperationKind;
pub use query::Query;
pub use schema::ArgumentDefinition;
pub use schema::ExtendedType;
pub use schema::FieldDefinition;
pub use schema::ObjectTypeDefinition;
pub use schema::Schema;
pub use schema::TypeKind;
pub use selection::InputValue;
pub use selection::Selection;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;

pub(crate) const TYPENAME: &str = "__typename";
pub(crate) const SCHEMA_FIELD: &str = "__schema";

/// GraphQL parsing errors.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SpecError {
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// invalid type error, expected another type than '{0}'
    InvalidType(String),
    /// cannot query field '{0}' on type '{1}'
    InvalidField(String, String),
    /// field '{0}' of type '{1}' must have a selection of subfields
    MissingSelection(String, String),
    /// field '{0}' must not have a selection since type '{1}' has no subfields
    UnexpectedSelection(String, String),
    /// parsing error: {0}
    ParsingError(String),
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Must provide operation name if query contains multiple operations.
    OperationNameRequired,
    /// invalid type for variable: '{0}'
    InvalidVariable(String),
    /// subscription operation is not supported
    SubscriptionNotSupported,
    /// fragments are not supported
    FragmentsNotSupported,
    /// directives are not supported
    DirectivesNotSupported,
    /// schema does not support {0} operations
    UnsupportedOperationKind(String),
    /// fields selected under the response key '{0}' cannot be merged
    FieldsConflict(String),
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::InvalidType(_) => "INVALID_TYPE",
            SpecError::InvalidField(_, _) => "INVALID_FIELD",
            SpecError::ParsingError(_) => "PARSING_ERROR",
            SpecError::InvalidVariable(_) => "VALIDATION_INVALID_TYPE_VARIABLE",
            SpecError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
            SpecError::MissingSelection(_, _)
            | SpecError::UnexpectedSelection(_, _)
            | SpecError::UnknownOperation(_)
            | SpecError::OperationNameRequired
            | SpecError::FragmentsNotSupported
            | SpecError::DirectivesNotSupported
            | SpecError::UnsupportedOperationKind(_)
            | SpecError::FieldsConflict(_) => "GRAPHQL_VALIDATION_FAILED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            SpecError::InvalidType(ty) => {
                obj.insert("type", ty.clone().into());
            }
            SpecError::InvalidField(field, ty)
            | SpecError::MissingSelection(field, ty)
            | SpecError::UnexpectedSelection(field, ty) => {
                obj.insert("type", ty.clone().into());
                obj.insert("field", field.clone().into());
            }
            SpecError::InvalidVariable(name) => {
                obj.insert("name", name.clone().into());
            }
            SpecError::FieldsConflict(response_key) => {
                obj.insert("responseKey", response_key.clone().into());
            }
            _ => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}
