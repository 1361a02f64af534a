//! The calculator: schema, resolvers and calculation history.

mod history;

use std::sync::Arc;

use displaydoc::Display;
pub use history::CalculationRecord;
pub use history::HistoryStore;
use serde::Serialize;
use serde_json_bytes::json;
use thiserror::Error;

use crate::error::FieldError;
use crate::error::SchemaError;
use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::resolver::ResolverTable;
use crate::services::ExecutionService;
use crate::spec::ArgumentError;
use crate::spec::Arguments;
use crate::spec::OperationKind;
use crate::spec::Schema;
use crate::Configuration;
use crate::Executor;

/// The calculator schema.
pub const SDL: &str = include_str!("schema.graphql");

/// An arithmetic operation. Parsed case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Applies the operation with IEEE-754 semantics. Dividing by zero is an error.
    pub fn apply(self, a: f64, b: f64) -> Result<f64, CalculatorError> {
        Ok(match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide if b == 0.0 => return Err(CalculatorError::DivisionByZero),
            Operation::Divide => a / b,
        })
    }
}

/// Calculator errors, reported on the field that failed.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CalculatorError {
    /// Unknown operation '{0}'. Allowed: ADD, SUBTRACT, MULTIPLY, DIVIDE
    UnsupportedOperation(String),
    /// Division by zero is undefined. Provide a non-zero divisor.
    DivisionByZero,
}

impl ErrorExtension for CalculatorError {
    fn extension_code(&self) -> String {
        match self {
            CalculatorError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            CalculatorError::DivisionByZero => "DIVISION_BY_ZERO",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        match self {
            CalculatorError::UnsupportedOperation(operation) => {
                let mut obj = Object::new();
                obj.insert("operation", operation.clone().into());
                Some(obj)
            }
            CalculatorError::DivisionByZero => None,
        }
    }
}

/// The root fields of the calculator schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum CalculatorField {
    Calculate,
    History,
    ClearHistory,
}

impl CalculatorField {
    pub fn kind(self) -> OperationKind {
        match self {
            CalculatorField::Calculate | CalculatorField::History => OperationKind::Query,
            CalculatorField::ClearHistory => OperationKind::Mutation,
        }
    }
}

/// State shared by every request: the calculation history.
#[derive(Debug)]
pub struct CalculatorContext {
    pub history: HistoryStore,
    default_limit: i64,
}

impl CalculatorContext {
    pub fn new(configuration: &Configuration) -> Self {
        CalculatorContext {
            history: HistoryStore::new(configuration.history.capacity),
            default_limit: configuration.history.default_limit,
        }
    }
}

/// The calculator schema, with the configured default for `history(limit:)`.
pub fn schema(configuration: &Configuration) -> Result<Schema, SchemaError> {
    let mut schema = Schema::parse(SDL)?;
    schema
        .argument_mut(
            OperationKind::Query.root_type_name(),
            &CalculatorField::History.to_string(),
            "limit",
        )?
        .default_value = Some(json!(configuration.history.default_limit));
    Ok(schema)
}

/// Resolvers for every root field of the calculator schema.
pub fn resolvers() -> ResolverTable<CalculatorContext> {
    let mut resolvers = ResolverTable::new();
    resolvers
        .register(
            CalculatorField::Calculate.kind(),
            CalculatorField::Calculate.to_string(),
            calculate,
        )
        .register(
            CalculatorField::History.kind(),
            CalculatorField::History.to_string(),
            history,
        )
        .register(
            CalculatorField::ClearHistory.kind(),
            CalculatorField::ClearHistory.to_string(),
            clear_history,
        );
    resolvers
}

pub fn executor(configuration: &Configuration) -> Result<Executor<CalculatorContext>, SchemaError> {
    Executor::new(schema(configuration)?, resolvers())
}

/// Builds the calculator service with an empty history.
pub fn service(
    configuration: Configuration,
) -> Result<ExecutionService<CalculatorContext>, SchemaError> {
    let executor = executor(&configuration)?;
    let context = CalculatorContext::new(&configuration);
    Ok(ExecutionService::new(
        Arc::new(executor),
        Arc::new(context),
        Arc::new(configuration),
    ))
}

fn required<T>(
    value: Option<T>,
    field: CalculatorField,
    argument: &str,
    ty: &str,
) -> Result<T, FieldError> {
    value.ok_or_else(|| {
        ArgumentError::MissingArgument {
            field: field.to_string(),
            argument: argument.to_string(),
            ty: ty.to_string(),
        }
        .into()
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, FieldError> {
    serde_json_bytes::to_value(value).map_err(|error| FieldError::Resolver {
        message: error.to_string(),
        code: "INTERNAL_SERVER_ERROR".to_string(),
        details: None,
    })
}

fn calculate(context: &CalculatorContext, arguments: &Arguments) -> Result<Value, FieldError> {
    let field = CalculatorField::Calculate;
    let a = required(arguments.float("a"), field, "a", "Float!")?;
    let b = required(arguments.float("b"), field, "b", "Float!")?;
    let requested = required(arguments.string("operation"), field, "operation", "String!")?;

    let operation = requested.parse::<Operation>().map_err(|_| {
        FieldError::resolver(CalculatorError::UnsupportedOperation(requested.to_string()))
    })?;
    let result = operation.apply(a, b).map_err(FieldError::resolver)?;

    let record = context.history.record(operation, a, b, result);
    tracing::debug!(id = %record.id, %operation, result, "calculation recorded");
    to_value(&record)
}

fn history(context: &CalculatorContext, arguments: &Arguments) -> Result<Value, FieldError> {
    // an explicit null falls back to the default
    let limit = arguments.int("limit").unwrap_or(context.default_limit);
    to_value(&context.history.last(limit))
}

fn clear_history(
    context: &CalculatorContext,
    _arguments: &Arguments,
) -> Result<Value, FieldError> {
    let removed = context.history.clear();
    tracing::debug!(removed, "history cleared");
    Ok(json!(removed))
}
