//! Answers `__schema` from the type registry.
//!
//! The meta types are registered like any other object type, so an introspection result is
//! projected through the selection set by the executor like resolver output is.

use serde_json_bytes::json;

use crate::error::SchemaError;
use crate::json_ext::Value;
use crate::spec::ArgumentDefinition;
use crate::spec::ExtendedType;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::ObjectTypeDefinition;
use crate::spec::OperationKind;
use crate::spec::Schema;

pub(crate) const SCHEMA_TYPE: &str = "__Schema";

fn field(name: &str, ty: FieldType) -> FieldDefinition {
    FieldDefinition::builder().name(name).ty(ty).build()
}

fn named(name: &str) -> FieldType {
    FieldType::Named(name.to_string())
}

fn non_null_list_of(name: &str) -> FieldType {
    FieldType::non_null(FieldType::list(FieldType::non_null(named(name))))
}

/// Registers `__Schema`, `__Type`, `__Field` and `__InputValue`.
pub(crate) fn register_meta_types(schema: &mut Schema) -> Result<(), SchemaError> {
    schema.register(
        ObjectTypeDefinition::builder()
            .name(SCHEMA_TYPE)
            .field(field("types", non_null_list_of("__Type")))
            .field(field("queryType", FieldType::non_null(named("__Type"))))
            .field(field("mutationType", named("__Type")))
            .build()?,
    )?;
    schema.register(
        ObjectTypeDefinition::builder()
            .name("__Type")
            .field(field("kind", FieldType::non_null(FieldType::String)))
            .field(field("name", FieldType::String))
            .field(field("description", FieldType::String))
            .field(field(
                "fields",
                FieldType::list(FieldType::non_null(named("__Field"))),
            ))
            .build()?,
    )?;
    schema.register(
        ObjectTypeDefinition::builder()
            .name("__Field")
            .field(field("name", FieldType::non_null(FieldType::String)))
            .field(field("description", FieldType::String))
            .field(field("type", FieldType::non_null(FieldType::String)))
            .field(field("args", non_null_list_of("__InputValue")))
            .build()?,
    )?;
    schema.register(
        ObjectTypeDefinition::builder()
            .name("__InputValue")
            .field(field("name", FieldType::non_null(FieldType::String)))
            .field(field("description", FieldType::String))
            .field(field("type", FieldType::non_null(FieldType::String)))
            .field(field("defaultValue", FieldType::String))
            .build()?,
    )?;
    Ok(())
}

/// The full `__Schema` object, computed from the current registry.
pub(crate) fn schema_value(schema: &Schema) -> Value {
    let root = |kind: OperationKind| {
        schema
            .lookup(kind.root_type_name())
            .map(type_value)
            .unwrap_or(Value::Null)
    };
    json!({
        "types": schema
            .types()
            .filter(|ty| !ty.is_internal())
            .map(type_value)
            .collect::<Vec<_>>(),
        "queryType": root(OperationKind::Query),
        "mutationType": root(OperationKind::Mutation),
    })
}

fn type_value(ty: &ExtendedType) -> Value {
    let fields = match ty {
        ExtendedType::Scalar(_) => Value::Null,
        ExtendedType::Object(object) => {
            Value::Array(object.fields.values().map(field_value).collect())
        }
    };
    json!({
        "kind": ty.kind().to_string(),
        "name": ty.name(),
        "description": ty.description(),
        "fields": fields,
    })
}

fn field_value(field: &FieldDefinition) -> Value {
    json!({
        "name": field.name,
        "description": field.description,
        "type": field.ty.to_string(),
        "args": field.arguments.iter().map(input_value).collect::<Vec<_>>(),
    })
}

fn input_value(argument: &ArgumentDefinition) -> Value {
    json!({
        "name": argument.name,
        "description": argument.description,
        "type": argument.ty.to_string(),
        "defaultValue": argument
            .default_value
            .as_ref()
            .and_then(|value| serde_json::to_string(value).ok()),
    })
}
