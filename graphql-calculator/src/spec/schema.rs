//! GraphQL schema: the registry of the types an operation can select from.

use apollo_parser::cst;
use apollo_parser::Parser;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ParseErrors;
use crate::error::SchemaError;
use crate::json_ext::Value;
use crate::spec::selection::parse_value;
use crate::spec::FieldType;
use crate::spec::OperationKind;

const BUILTIN_SCALARS: &[(&str, &str)] = &[
    (
        "String",
        "The `String` scalar type represents textual data, represented as UTF-8 character sequences.",
    ),
    (
        "Int",
        "The `Int` scalar type represents non-fractional signed whole numeric values between -(2^31) and 2^31 - 1.",
    ),
    (
        "Float",
        "The `Float` scalar type represents signed double-precision fractional values as specified by IEEE 754.",
    ),
    (
        "ID",
        "The `ID` scalar type represents a unique identifier, serialized in the same way as a String.",
    ),
    ("Boolean", "The `Boolean` scalar type represents `true` or `false`."),
];

/// The kind of a registered type, as reported by introspection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeKind {
    Scalar,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

/// A registered type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendedType {
    Scalar(ScalarType),
    Object(ObjectTypeDefinition),
}

impl ExtendedType {
    pub fn name(&self) -> &str {
        match self {
            ExtendedType::Scalar(scalar) => &scalar.name,
            ExtendedType::Object(object) => &object.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            ExtendedType::Scalar(_) => TypeKind::Scalar,
            ExtendedType::Object(_) => TypeKind::Object,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ExtendedType::Scalar(scalar) => scalar.description.as_deref(),
            ExtendedType::Object(object) => object.description.as_deref(),
        }
    }

    /// Introspection meta types (`__Schema`, `__Type`...) are internal.
    pub fn is_internal(&self) -> bool {
        self.name().starts_with("__")
    }
}

/// An object type and its fields, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[buildstructor::buildstructor]
impl ObjectTypeDefinition {
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        description: Option<String>,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, SchemaError> {
        let mut definition = ObjectTypeDefinition {
            name,
            description,
            fields: IndexMap::new(),
        };
        for field in fields {
            definition.add_field(field)?;
        }
        Ok(definition)
    }

    /// Adds a field, failing if a field with the same name is already declared.
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<(), SchemaError> {
        if self.fields.contains_key(&field.name) {
            return Err(SchemaError::DuplicateField {
                ty: self.name.clone(),
                field: field.name,
            });
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentDefinition>,
}

#[buildstructor::buildstructor]
impl FieldDefinition {
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        description: Option<String>,
        ty: FieldType,
        arguments: Vec<ArgumentDefinition>,
    ) -> Self {
        FieldDefinition {
            name,
            description,
            ty,
            arguments,
        }
    }

    pub fn is_nullable(&self) -> bool {
        !self.ty.is_non_null()
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub description: Option<String>,
    pub ty: FieldType,
    pub default_value: Option<Value>,
}

#[buildstructor::buildstructor]
impl ArgumentDefinition {
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        description: Option<String>,
        ty: FieldType,
        default_value: Option<Value>,
    ) -> Self {
        ArgumentDefinition {
            name,
            description,
            ty,
            default_value,
        }
    }

    pub fn is_nullable(&self) -> bool {
        !self.ty.is_non_null()
    }
}

/// A GraphQL schema.
///
/// Built-in scalars are always registered first. The root types are the object types named
/// `Query` and `Mutation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    types: IndexMap<String, ExtendedType>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// An empty schema, holding only the built-in scalars.
    pub fn new() -> Self {
        let types = BUILTIN_SCALARS
            .iter()
            .map(|(name, description)| {
                (
                    name.to_string(),
                    ExtendedType::Scalar(ScalarType {
                        name: name.to_string(),
                        description: Some(description.to_string()),
                    }),
                )
            })
            .collect();
        Schema { types }
    }

    /// Parses object type definitions from SDL and registers them.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let tree = Parser::new(sdl).parse();
        let errors = tree
            .errors()
            .map(|err| format!("{} at index {}", err.message(), err.index()))
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            return Err(SchemaError::Parse(ParseErrors { errors }));
        }

        let mut schema = Schema::new();
        for definition in tree.document().definitions() {
            match definition {
                cst::Definition::ObjectTypeDefinition(object) => {
                    schema.register(object_from_cst(object)?)?;
                }
                other => {
                    return Err(SchemaError::UnsupportedDefinition(
                        definition_kind(&other).to_string(),
                    ))
                }
            }
        }
        tracing::trace!(types = schema.types.len(), "parsed schema");
        Ok(schema)
    }

    /// Registers an object type, failing if the name is taken.
    pub fn register(&mut self, object: ObjectTypeDefinition) -> Result<(), SchemaError> {
        if self.types.contains_key(&object.name) {
            return Err(SchemaError::DuplicateType(object.name));
        }
        self.types
            .insert(object.name.clone(), ExtendedType::Object(object));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ExtendedType, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectTypeDefinition> {
        match self.types.get(name) {
            Some(ExtendedType::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn root_type(&self, kind: OperationKind) -> Option<&ObjectTypeDefinition> {
        self.object_type(kind.root_type_name())
    }

    /// Registered types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &ExtendedType> {
        self.types.values()
    }

    /// Checks that every type referenced by a field or an argument is registered.
    pub fn check_references(&self) -> Result<(), SchemaError> {
        for ty in self.types() {
            let ExtendedType::Object(object) = ty else {
                continue;
            };
            for field in object.fields.values() {
                let referenced = std::iter::once(&field.ty)
                    .chain(field.arguments.iter().map(|argument| &argument.ty));
                for field_type in referenced {
                    self.lookup(&field_type.inner_name())?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn argument_mut(
        &mut self,
        ty: &str,
        field: &str,
        argument: &str,
    ) -> Result<&mut ArgumentDefinition, SchemaError> {
        let unknown_field = || SchemaError::UnknownField {
            ty: ty.to_string(),
            field: field.to_string(),
        };
        match self.types.get_mut(ty) {
            Some(ExtendedType::Object(object)) => object
                .fields
                .get_mut(field)
                .ok_or_else(unknown_field)?
                .arguments
                .iter_mut()
                .find(|definition| definition.name == argument)
                .ok_or_else(|| SchemaError::UnknownField {
                    ty: format!("{ty}.{field}"),
                    field: argument.to_string(),
                }),
            _ => Err(SchemaError::UnknownType(ty.to_string())),
        }
    }
}

fn definition_kind(definition: &cst::Definition) -> &'static str {
    match definition {
        cst::Definition::OperationDefinition(_) => "operation",
        cst::Definition::FragmentDefinition(_) => "fragment",
        cst::Definition::DirectiveDefinition(_) => "directive definition",
        cst::Definition::SchemaDefinition(_) => "schema definition",
        cst::Definition::ScalarTypeDefinition(_) => "scalar type definition",
        cst::Definition::InterfaceTypeDefinition(_) => "interface type definition",
        cst::Definition::UnionTypeDefinition(_) => "union type definition",
        cst::Definition::EnumTypeDefinition(_) => "enum type definition",
        cst::Definition::InputObjectTypeDefinition(_) => "input object type definition",
        _ => "type system extension",
    }
}

fn description(description: Option<cst::Description>) -> Option<String> {
    description
        .and_then(|description| description.string_value())
        .map(|value| String::from(&value).trim().to_string())
}

fn name(name: Option<cst::Name>) -> Result<String, SchemaError> {
    name.map(|name| name.text().to_string()).ok_or_else(|| {
        SchemaError::UnsupportedDefinition("the node Name is not optional in the spec".to_string())
    })
}

fn field_type(ty: Option<cst::Type>) -> Result<FieldType, SchemaError> {
    ty.ok_or_else(|| {
        SchemaError::UnsupportedDefinition("the node Type is not optional in the spec".to_string())
    })?
    .try_into()
    .map_err(|error: crate::spec::SpecError| SchemaError::UnsupportedDefinition(error.to_string()))
}

fn object_from_cst(object: cst::ObjectTypeDefinition) -> Result<ObjectTypeDefinition, SchemaError> {
    let mut definition = ObjectTypeDefinition::builder()
        .name(name(object.name())?)
        .and_description(description(object.description()))
        .build()?;

    for field in object
        .fields_definition()
        .iter()
        .flat_map(|fields| fields.field_definitions())
    {
        let arguments = field
            .arguments_definition()
            .iter()
            .flat_map(|arguments| arguments.input_value_definitions())
            .map(|argument| {
                Ok(ArgumentDefinition::builder()
                    .name(name(argument.name())?)
                    .and_description(description(argument.description()))
                    .ty(field_type(argument.ty())?)
                    .and_default_value(
                        argument
                            .default_value()
                            .and_then(|default| default.value())
                            .and_then(|value| parse_value(&value)),
                    )
                    .build())
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        definition.add_field(
            FieldDefinition::builder()
                .name(name(field.name())?)
                .and_description(description(field.description()))
                .ty(field_type(field.ty())?)
                .arguments(arguments)
                .build(),
        )?;
    }
    Ok(definition)
}
