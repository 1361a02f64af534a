//! Operation execution.
//!
//! Root fields are dispatched to their resolver in document order. Each resolved value is then
//! projected through the field's selection set, guided by the schema, so only the requested keys
//! of a resolver output are ever read.
//!
//! Field failures never abort the operation: the error is recorded once, at the path of the
//! failing field, and the field becomes null. When the field is non-null, the null propagates to
//! the nearest nullable ancestor, or to `data` itself.

use std::sync::Arc;

use crate::error::FieldError;
use crate::error::SchemaError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Location;
use crate::graphql::Response;
use crate::introspection;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::resolver::ResolverTable;
use crate::spec::arguments::coerce_arguments;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::InvalidValue;
use crate::spec::Operation;
use crate::spec::OperationKind;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SpecError;
use crate::spec::SCHEMA_FIELD;
use crate::spec::TYPENAME;

/// Executes operations against a schema and the resolvers of its root fields.
///
/// `C` is the user context handed to every resolver.
#[derive(Debug)]
pub struct Executor<C> {
    schema: Arc<Schema>,
    resolvers: ResolverTable<C>,
}

impl<C> Executor<C> {
    /// Builds an executor, checking the resolvers match the root fields of the schema.
    pub fn new(mut schema: Schema, resolvers: ResolverTable<C>) -> Result<Self, SchemaError> {
        introspection::register_meta_types(&mut schema)?;
        schema.check_references()?;

        if schema.root_type(OperationKind::Query).is_none() {
            return Err(SchemaError::MissingRootType(OperationKind::Query));
        }
        for kind in [OperationKind::Query, OperationKind::Mutation] {
            for field in schema
                .root_type(kind)
                .iter()
                .flat_map(|root| root.fields.keys())
            {
                if !resolvers.contains(kind, field) {
                    return Err(SchemaError::MissingResolver {
                        kind,
                        field: field.clone(),
                    });
                }
            }
        }
        for (kind, field) in resolvers.fields() {
            if schema
                .root_type(kind)
                .and_then(|root| root.field(field))
                .is_none()
            {
                return Err(SchemaError::UnknownField {
                    ty: kind.root_type_name().to_string(),
                    field: field.to_string(),
                });
            }
        }

        Ok(Executor {
            schema: Arc::new(schema),
            resolvers,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Checks the operation selects existing root fields, with a selection set exactly where
    /// the selected type is an object.
    ///
    /// Unknown fields below the root are not checked here, they fail at execution time.
    pub fn validate(&self, operation: &Operation) -> Result<(), SpecError> {
        if self.schema.root_type(operation.kind).is_none() {
            let kind = operation.kind.to_string().to_lowercase();
            return Err(SpecError::UnsupportedOperationKind(kind));
        }
        let root_name = operation.kind.root_type_name();
        self.validate_selection_set(root_name, &operation.selection_set, Some(operation.kind))
    }

    fn validate_selection_set(
        &self,
        type_name: &str,
        selection_set: &[Selection],
        root: Option<OperationKind>,
    ) -> Result<(), SpecError> {
        let object = self.schema.object_type(type_name);
        for selection in selection_set {
            let ty = if selection.name == TYPENAME {
                FieldType::non_null(FieldType::String)
            } else if selection.name == SCHEMA_FIELD && root == Some(OperationKind::Query) {
                FieldType::non_null(FieldType::Named(introspection::SCHEMA_TYPE.to_string()))
            } else {
                match object.and_then(|object| object.field(&selection.name)) {
                    Some(field) => field.ty.clone(),
                    None if root.is_some() => {
                        return Err(SpecError::InvalidField(
                            selection.name.clone(),
                            type_name.to_string(),
                        ))
                    }
                    None => continue,
                }
            };

            match (ty.inner_type_name(), &selection.selection_set) {
                (None, Some(_)) => {
                    return Err(SpecError::UnexpectedSelection(
                        selection.name.clone(),
                        ty.to_string(),
                    ))
                }
                (Some(_), None) => {
                    return Err(SpecError::MissingSelection(
                        selection.name.clone(),
                        ty.to_string(),
                    ))
                }
                (Some(inner), Some(selection_set)) => {
                    self.validate_selection_set(inner, selection_set, None)?
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    /// Executes one operation.
    ///
    /// Malformed operations produce a response without `data`. Otherwise the response holds the
    /// data for every root field, next to the errors of the fields that failed.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn execute(&self, operation: &Operation, variables: &Object, context: &C) -> Response {
        if let Err(error) = self.validate(operation) {
            tracing::debug!(%error, "invalid operation");
            return Response::builder()
                .error(error.to_graphql_error(None, Vec::new()))
                .build();
        }

        let root_name = operation.kind.root_type_name();
        let mut execution = ExecutionContext {
            schema: &self.schema,
            variables,
            errors: Vec::new(),
        };
        let mut data = Object::new();
        let mut nulled = false;

        // root fields run one after the other, in document order
        for selection in &operation.selection_set {
            let key = selection.response_key();
            let mut path = Path(vec![PathElement::Key(key.to_string())]);

            let completed = match selection.name.as_str() {
                TYPENAME => Ok(Value::String(root_name.into())),
                SCHEMA_FIELD => execution.complete_value(
                    &FieldType::non_null(FieldType::Named(introspection::SCHEMA_TYPE.to_string())),
                    &introspection::schema_value(&self.schema),
                    selection,
                    root_name,
                    &mut path,
                ),
                name => match self
                    .schema
                    .root_type(operation.kind)
                    .and_then(|root| root.field(name))
                {
                    Some(field) => self.resolve_root_field(
                        &mut execution,
                        operation.kind,
                        field,
                        selection,
                        context,
                        &mut path,
                    ),
                    None => {
                        failfast_debug!("root field {name} was not validated");
                        execution.field_failure(
                            FieldError::UnknownField {
                                field: name.to_string(),
                                ty: root_name.to_string(),
                            },
                            &FieldType::String,
                            &path,
                            selection.location,
                        )
                    }
                },
            };

            match completed {
                Ok(value) => {
                    data.insert(key, value);
                }
                // sibling root fields still run, their errors are still reported
                Err(InvalidValue) => nulled = true,
            }
        }

        let data = if nulled {
            Value::Null
        } else {
            Value::Object(data)
        };
        Response::builder()
            .data(data)
            .errors(execution.errors)
            .build()
    }

    fn resolve_root_field(
        &self,
        execution: &mut ExecutionContext<'_>,
        kind: OperationKind,
        field: &FieldDefinition,
        selection: &Selection,
        context: &C,
        path: &mut Path,
    ) -> Result<Value, InvalidValue> {
        let arguments =
            match coerce_arguments(field, &selection.arguments, execution.variables) {
                Ok(arguments) => arguments,
                Err(error) => {
                    return execution.field_failure(
                        error.into(),
                        &field.ty,
                        path,
                        selection.location,
                    )
                }
            };

        tracing::debug!(%kind, field = %field.name, "dispatching resolver");
        let resolved = self
            .resolvers
            .dispatch(kind, &field.name)
            .and_then(|resolver| resolver(context, &arguments));

        match resolved {
            Ok(value) => {
                execution.complete_value(&field.ty, &value, selection, kind.root_type_name(), path)
            }
            Err(error) => {
                tracing::debug!(%error, field = %field.name, "resolver failed");
                execution.field_failure(error, &field.ty, path, selection.location)
            }
        }
    }
}

/// Per request execution state.
struct ExecutionContext<'a> {
    schema: &'a Schema,
    variables: &'a Object,
    errors: Vec<Error>,
}

impl ExecutionContext<'_> {
    fn record(&mut self, error: FieldError, path: &Path, location: Location) {
        self.errors
            .push(error.to_graphql_error(Some(path.clone()), vec![location]));
    }

    /// Records a failure at a field of type `ty`: the field becomes null, or the null
    /// propagates when the field is non-null.
    fn field_failure(
        &mut self,
        error: FieldError,
        ty: &FieldType,
        path: &Path,
        location: Location,
    ) -> Result<Value, InvalidValue> {
        self.record(error, path, location);
        if ty.is_non_null() {
            Err(InvalidValue)
        } else {
            Ok(Value::Null)
        }
    }

    /// Completes a value at a position of type `ty`.
    ///
    /// `Err(InvalidValue)` means the position is non-null and could not be completed. The error
    /// was already recorded, the caller must null the nearest nullable ancestor.
    fn complete_value(
        &mut self,
        ty: &FieldType,
        value: &Value,
        selection: &Selection,
        parent_type: &str,
        path: &mut Path,
    ) -> Result<Value, InvalidValue> {
        match ty {
            FieldType::NonNull(inner) => {
                match self.complete_inner(inner, value, selection, parent_type, path)? {
                    Value::Null => {
                        self.record(
                            FieldError::NullValue {
                                ty: parent_type.to_string(),
                                field: selection.name.clone(),
                            },
                            path,
                            selection.location,
                        );
                        Err(InvalidValue)
                    }
                    completed => Ok(completed),
                }
            }
            // a nullable position absorbs the failures of its children
            nullable => Ok(self
                .complete_inner(nullable, value, selection, parent_type, path)
                .unwrap_or(Value::Null)),
        }
    }

    fn complete_inner(
        &mut self,
        ty: &FieldType,
        value: &Value,
        selection: &Selection,
        parent_type: &str,
        path: &mut Path,
    ) -> Result<Value, InvalidValue> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match ty {
            FieldType::List(inner) => {
                let Value::Array(items) = value else {
                    return self.invalid_output(ty, value, selection, parent_type, path);
                };
                let mut completed = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(PathElement::Index(index));
                    let result = self.complete_value(inner, item, selection, parent_type, path);
                    path.pop();
                    completed.push(result?);
                }
                Ok(Value::Array(completed))
            }
            FieldType::Named(type_name) => {
                let Value::Object(object) = value else {
                    return self.invalid_output(ty, value, selection, parent_type, path);
                };
                let selection_set = selection.selection_set.as_deref().unwrap_or_default();
                self.apply_selection_set(type_name, object, selection_set, path)
                    .map(Value::Object)
            }
            FieldType::NonNull(_) => {
                failfast_debug!("nested non null type {ty}");
                self.complete_value(ty, value, selection, parent_type, path)
            }
            scalar => match scalar.coerce_output_value(value) {
                Ok(value) => Ok(value),
                Err(InvalidValue) => self.invalid_output(ty, value, selection, parent_type, path),
            },
        }
    }

    /// Records a resolved value that does not match its declared type. The caller nulls the
    /// position, or propagates when it is non-null.
    fn invalid_output(
        &mut self,
        ty: &FieldType,
        value: &Value,
        selection: &Selection,
        parent_type: &str,
        path: &Path,
    ) -> Result<Value, InvalidValue> {
        tracing::debug!(%path, "expected a value of type {ty}");
        self.record(
            FieldError::InvalidOutput {
                ty: parent_type.to_string(),
                field: selection.name.clone(),
                expected: ty.to_string(),
                value: serde_json::to_string(value).unwrap_or_default(),
            },
            path,
            selection.location,
        );
        Err(InvalidValue)
    }

    /// Reads the selected keys of a resolved object, in selection order.
    fn apply_selection_set(
        &mut self,
        type_name: &str,
        object: &Object,
        selection_set: &[Selection],
        path: &mut Path,
    ) -> Result<Object, InvalidValue> {
        let Some(definition) = self.schema.object_type(type_name) else {
            failfast_debug!("type {type_name} is not registered");
            return Ok(Object::new());
        };

        let mut output = Object::new();
        let mut nulled = false;
        for selection in selection_set {
            let key = selection.response_key();
            path.push(PathElement::Key(key.to_string()));

            let completed = if selection.name == TYPENAME {
                Ok(Value::String(type_name.into()))
            } else {
                match definition.field(&selection.name) {
                    Some(field) => self.complete_field(field, type_name, object, selection, path),
                    // an undeclared field is a nullable position
                    None => self.field_failure(
                        FieldError::UnknownField {
                            field: selection.name.clone(),
                            ty: type_name.to_string(),
                        },
                        &FieldType::String,
                        path,
                        selection.location,
                    ),
                }
            };
            path.pop();

            match completed {
                Ok(value) => {
                    output.insert(key, value);
                }
                // keep going so the errors of the siblings are reported too
                Err(InvalidValue) => nulled = true,
            }
        }

        if nulled {
            Err(InvalidValue)
        } else {
            Ok(output)
        }
    }

    fn complete_field(
        &mut self,
        field: &FieldDefinition,
        parent_type: &str,
        object: &Object,
        selection: &Selection,
        path: &mut Path,
    ) -> Result<Value, InvalidValue> {
        if !field.arguments.is_empty() || !selection.arguments.is_empty() {
            if let Err(error) = coerce_arguments(field, &selection.arguments, self.variables) {
                return self.field_failure(error.into(), &field.ty, path, selection.location);
            }
        }
        let value = object.get(field.name.as_str()).unwrap_or(&Value::Null);
        self.complete_value(&field.ty, value, selection, parent_type, path)
    }
}
