//! Field argument coercion.

use displaydoc::Display;
use indexmap::IndexMap;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::FieldDefinition;
use crate::spec::InputValue;

/// Argument coercion failure, scoped to the field it was provided to.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArgumentError {
    /// Field "{field}" argument "{argument}" of type "{ty}" is required, but it was not provided.
    MissingArgument {
        field: String,
        argument: String,
        ty: String,
    },
    /// Unknown argument "{argument}" on field "{field}".
    UnknownArgument { field: String, argument: String },
    /// Argument "{argument}" on field "{field}" has invalid value {value}. Expected type "{ty}".
    ArgumentType {
        field: String,
        argument: String,
        ty: String,
        value: String,
    },
}

impl ErrorExtension for ArgumentError {
    fn extension_code(&self) -> String {
        match self {
            ArgumentError::MissingArgument { .. } => "MISSING_ARGUMENT",
            ArgumentError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            ArgumentError::ArgumentType { .. } => "ARGUMENT_TYPE",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let (field, argument) = match self {
            ArgumentError::MissingArgument {
                field, argument, ..
            }
            | ArgumentError::UnknownArgument { field, argument }
            | ArgumentError::ArgumentType {
                field, argument, ..
            } => (field, argument),
        };
        let mut obj = Object::new();
        obj.insert("field", field.clone().into());
        obj.insert("argument", argument.clone().into());
        Some(obj)
    }
}

/// Coerced arguments, keyed by argument name.
///
/// Absent nullable arguments without a default are not present at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Object);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}

impl From<Object> for Arguments {
    fn from(object: Object) -> Self {
        Arguments(object)
    }
}

/// Coerces the arguments provided to a field against its argument definitions.
///
/// Variables are substituted first; a variable that was not provided makes the argument absent.
pub(crate) fn coerce_arguments(
    field: &FieldDefinition,
    provided: &IndexMap<String, InputValue>,
    variables: &Object,
) -> Result<Arguments, ArgumentError> {
    if let Some(unknown) = provided
        .keys()
        .find(|name| field.argument(name.as_str()).is_none())
    {
        return Err(ArgumentError::UnknownArgument {
            field: field.name.clone(),
            argument: unknown.clone(),
        });
    }

    let mut coerced = Object::new();
    for definition in &field.arguments {
        let value = provided
            .get(&definition.name)
            .and_then(|value| value.resolve(variables));

        let value = match (value, &definition.default_value) {
            (Some(value), _) => value,
            (None, Some(default_value)) => default_value.clone(),
            (None, None) if definition.is_nullable() => continue,
            (None, None) => {
                return Err(ArgumentError::MissingArgument {
                    field: field.name.clone(),
                    argument: definition.name.clone(),
                    ty: definition.ty.to_string(),
                })
            }
        };

        let value = definition.ty.coerce_input_value(&value).map_err(|_| {
            ArgumentError::ArgumentType {
                field: field.name.clone(),
                argument: definition.name.clone(),
                ty: definition.ty.to_string(),
                value: serde_json::to_string(&value).unwrap_or_default(),
            }
        })?;
        coerced.insert(definition.name.as_str(), value);
    }

    Ok(Arguments(coerced))
}
