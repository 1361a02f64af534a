use apollo_parser::cst;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::SpecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InvalidValue;

/// The declared type of a field, an argument or a variable.
// Primitives are taken from scalars: https://spec.graphql.org/draft/#sec-Scalars
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// An object type, by name
    Named(String),
    List(Box<FieldType>),
    NonNull(Box<FieldType>),
    String,
    Int,
    Float,
    Id,
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// Wraps a type in a non null type.
    pub fn non_null(ty: FieldType) -> Self {
        FieldType::NonNull(Box::new(ty))
    }

    /// Wraps a type in a list type.
    pub fn list(ty: FieldType) -> Self {
        FieldType::List(Box::new(ty))
    }

    /// Builds a type from a type name, mapping the built-in scalar names.
    pub fn named(name: &str) -> Self {
        match name {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "ID" => Self::Id,
            "Boolean" => Self::Boolean,
            _ => Self::Named(name.to_string()),
        }
    }

    // This function coerces input values according to the graphql specification.
    // Each of the values are coerced with the "input coercion" rules and the
    // coerced value is returned.
    pub(crate) fn coerce_input_value(&self, value: &Value) -> Result<Value, InvalidValue> {
        match (self, value) {
            (FieldType::NonNull(inner_ty), value) => {
                if value.is_null() {
                    Err(InvalidValue)
                } else {
                    inner_ty.coerce_input_value(value)
                }
            }
            // NOTE: graphql's types are all optional by default
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::String, Value::String(_)) => Ok(value.clone()),
            // Spec: https://spec.graphql.org/June2018/#sec-Int
            (FieldType::Int, maybe_int) if maybe_int.is_valid_int_input() => Ok(value.clone()),
            // Spec: https://spec.graphql.org/draft/#sec-Float.Input-Coercion
            (FieldType::Float, maybe_float) if maybe_float.is_valid_float_input() => maybe_float
                .as_f64()
                .map(Value::from)
                .ok_or(InvalidValue),
            // "The ID scalar type represents a unique identifier [..] The ID type is serialized
            // in the same way as a String"
            (FieldType::Id, Value::String(_)) => Ok(value.clone()),
            (FieldType::Id, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(Value::String(n.to_string().into()))
            }
            (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (FieldType::List(inner_ty), Value::Array(vec)) => vec
                .iter()
                .map(|x| inner_ty.coerce_input_value(x))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // For coercion from single value to list
            (FieldType::List(inner_ty), val) => {
                Ok(Value::Array(vec![inner_ty.coerce_input_value(val)?]))
            }
            // there are no input object types in this schema
            _ => Err(InvalidValue),
        }
    }

    /// Serializes a resolved leaf value. Values this scalar cannot represent are invalid.
    ///
    /// Spec: https://spec.graphql.org/October2021/#sec-Scalars.Result-Coercion-and-Serialization
    pub(crate) fn coerce_output_value(&self, value: &Value) -> Result<Value, InvalidValue> {
        match (self, value) {
            (FieldType::String, Value::String(_)) | (FieldType::Boolean, Value::Bool(_)) => {
                Ok(value.clone())
            }
            (FieldType::Int, maybe_int) if maybe_int.is_valid_int_input() => Ok(value.clone()),
            (FieldType::Float, maybe_float) if maybe_float.is_valid_float_input() => maybe_float
                .as_f64()
                .map(Value::from)
                .ok_or(InvalidValue),
            (FieldType::Id, Value::String(_)) => Ok(value.clone()),
            (FieldType::Id, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(Value::String(n.to_string().into()))
            }
            _ => Err(InvalidValue),
        }
    }

    /// return the name of the type on which selections happen
    ///
    /// Example if we get the field `list: [User!]!`, it will return "User"
    pub fn inner_type_name(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name.as_str()),
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => None,
        }
    }

    /// return the name of the innermost type, scalars included
    pub(crate) fn inner_name(&self) -> String {
        match self {
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_name(),
            other => other.to_string(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }
}

impl TryFrom<cst::Type> for FieldType {
    type Error = SpecError;
    // Spec: https://spec.graphql.org/draft/#sec-Type-References
    fn try_from(ty: cst::Type) -> Result<Self, Self::Error> {
        match ty {
            cst::Type::NamedType(named) => named.try_into(),
            cst::Type::ListType(list) => list.try_into(),
            cst::Type::NonNullType(non_null) => non_null.try_into(),
        }
    }
}

impl TryFrom<cst::NamedType> for FieldType {
    type Error = SpecError;
    // Spec: https://spec.graphql.org/draft/#NamedType
    fn try_from(named: cst::NamedType) -> Result<Self, Self::Error> {
        let name = named
            .name()
            .ok_or_else(|| {
                SpecError::InvalidType("the node Name is not optional in the spec; qed".to_string())
            })?
            .text()
            .to_string();
        Ok(FieldType::named(&name))
    }
}

impl TryFrom<cst::ListType> for FieldType {
    type Error = SpecError;

    // Spec: https://spec.graphql.org/draft/#ListType
    fn try_from(list: cst::ListType) -> Result<Self, Self::Error> {
        Ok(Self::List(Box::new(
            list.ty()
                .ok_or_else(|| {
                    SpecError::InvalidType("node Type is not optional in the spec; qed".to_string())
                })?
                .try_into()?,
        )))
    }
}

impl TryFrom<cst::NonNullType> for FieldType {
    type Error = SpecError;

    // Spec: https://spec.graphql.org/draft/#NonNullType
    fn try_from(non_null: cst::NonNullType) -> Result<Self, Self::Error> {
        if let Some(list) = non_null.list_type() {
            Ok(Self::NonNull(Box::new(list.try_into()?)))
        } else if let Some(named) = non_null.named_type() {
            Ok(Self::NonNull(Box::new(named.try_into()?)))
        } else {
            Err(SpecError::InvalidType(
                "either the NamedType node is provided, either the ListType node; qed".to_string(),
            ))
        }
    }
}
