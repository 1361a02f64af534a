use apollo_parser::cst;
use apollo_parser::cst::CstNode;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::SpecError;

/// A field selected in an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, InputValue>,
    /// `None` for leaf selections.
    pub selection_set: Option<Vec<Selection>>,
    pub location: Location,
}

impl Selection {
    /// The key this field is written under in the response: the alias if present.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    // Spec: https://spec.graphql.org/draft/#Field
    pub(crate) fn from_cst(
        selection: cst::Selection,
        source: &str,
        depth: usize,
        max_depth: usize,
    ) -> Result<Self, SpecError> {
        if depth > max_depth {
            tracing::debug!("selection depth limit({max_depth}) exceeded");
            return Err(SpecError::RecursionLimitExceeded);
        }

        let field = match selection {
            cst::Selection::Field(field) => field,
            cst::Selection::FragmentSpread(_) | cst::Selection::InlineFragment(_) => {
                return Err(SpecError::FragmentsNotSupported)
            }
        };
        if field.directives().is_some() {
            return Err(SpecError::DirectivesNotSupported);
        }

        let name = field
            .name()
            .ok_or_else(|| {
                SpecError::ParsingError(
                    "the node Name is not optional in the spec; qed".to_string(),
                )
            })?
            .text()
            .to_string();
        let alias = field
            .alias()
            .and_then(|alias| alias.name())
            .map(|name| name.text().to_string());

        let arguments = field
            .arguments()
            .iter()
            .flat_map(|arguments| arguments.arguments())
            .map(|argument| {
                let name = argument
                    .name()
                    .ok_or_else(|| {
                        SpecError::ParsingError(
                            "the node Name is not optional in the spec; qed".to_string(),
                        )
                    })?
                    .text()
                    .to_string();
                let value = argument.value().ok_or_else(|| {
                    SpecError::ParsingError(
                        "the node Value is not optional in the spec; qed".to_string(),
                    )
                })?;
                Ok((name, InputValue::from_cst(&value)?))
            })
            .collect::<Result<IndexMap<_, _>, SpecError>>()?;

        let selection_set = field
            .selection_set()
            .map(|selection_set| {
                selection_set
                    .selections()
                    .map(|selection| Selection::from_cst(selection, source, depth + 1, max_depth))
                    .collect::<Result<Vec<_>, _>>()
                    .and_then(merge_selections)
            })
            .transpose()?;

        let offset: usize = field.syntax().text_range().start().into();

        Ok(Selection {
            name,
            alias,
            arguments,
            selection_set,
            location: location(source, offset),
        })
    }
}

/// Merges the selections written under the same response key.
///
/// They must select the same field with the same arguments. Their sub-selections are merged in
/// turn, and the first occurrence keeps its position and location.
pub(crate) fn merge_selections(selections: Vec<Selection>) -> Result<Vec<Selection>, SpecError> {
    let mut merged: IndexMap<String, Selection> = IndexMap::with_capacity(selections.len());
    for selection in selections {
        let response_key = selection.response_key().to_string();
        let existing = match merged.entry(response_key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(selection);
                continue;
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };
        if existing.name != selection.name || existing.arguments != selection.arguments {
            return Err(SpecError::FieldsConflict(response_key));
        }
        match (&mut existing.selection_set, selection.selection_set) {
            (Some(selection_set), Some(other)) => {
                selection_set.extend(other);
                *selection_set = merge_selections(std::mem::take(selection_set))?;
            }
            (None, None) => {}
            _ => return Err(SpecError::FieldsConflict(response_key)),
        }
    }
    Ok(merged.into_values().collect())
}

/// An argument value as written in the document, before variables are substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputValue {
    Value(Value),
    Variable(String),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    pub(crate) fn from_cst(value: &cst::Value) -> Result<Self, SpecError> {
        Ok(match value {
            cst::Value::Variable(variable) => InputValue::Variable(
                variable
                    .name()
                    .ok_or_else(|| {
                        SpecError::ParsingError(
                            "the node Name is not optional in the spec; qed".to_string(),
                        )
                    })?
                    .text()
                    .to_string(),
            ),
            cst::Value::ListValue(list) => InputValue::List(
                list.values()
                    .map(|value| InputValue::from_cst(&value))
                    .collect::<Result<_, _>>()?,
            ),
            cst::Value::ObjectValue(object) => InputValue::Object(
                object
                    .object_fields()
                    .filter_map(|field| Some((field.name()?.text().to_string(), field.value()?)))
                    .map(|(name, value)| Ok((name, InputValue::from_cst(&value)?)))
                    .collect::<Result<_, SpecError>>()?,
            ),
            constant => InputValue::Value(parse_value(constant).ok_or_else(|| {
                SpecError::ParsingError(format!("invalid value '{}'", constant.syntax().text()))
            })?),
        })
    }

    /// Substitutes variables. `None` means the value refers to a variable that was not provided.
    pub fn resolve(&self, variables: &Object) -> Option<Value> {
        match self {
            InputValue::Value(value) => Some(value.clone()),
            InputValue::Variable(name) => variables.get(name.as_str()).cloned(),
            InputValue::List(values) => Some(Value::Array(
                values
                    .iter()
                    .map(|value| value.resolve(variables).unwrap_or(Value::Null))
                    .collect(),
            )),
            InputValue::Object(fields) => Some(Value::Object(
                fields
                    .iter()
                    .filter_map(|(name, value)| {
                        Some((name.as_str().into(), value.resolve(variables)?))
                    })
                    .collect(),
            )),
        }
    }
}

/// Converts a constant value. Variables are not constants.
pub(crate) fn parse_value(value: &cst::Value) -> Option<Value> {
    match value {
        cst::Value::Variable(_) => None,
        cst::Value::StringValue(s) => Some(String::from(s).into()),
        cst::Value::FloatValue(f) => f
            .float_token()?
            .text()
            .parse::<f64>()
            .ok()
            .map(Into::into),
        cst::Value::IntValue(i) => {
            let token = i.int_token()?;
            let s = token.text();
            s.parse::<i64>()
                .ok()
                .map(Into::into)
                .or_else(|| s.parse::<u64>().ok().map(Into::into))
        }
        cst::Value::BooleanValue(b) => {
            match (b.true_token().is_some(), b.false_token().is_some()) {
                (true, false) => Some(Value::Bool(true)),
                (false, true) => Some(Value::Bool(false)),
                _ => None,
            }
        }
        cst::Value::NullValue(_) => Some(Value::Null),
        cst::Value::EnumValue(e) => e.name().map(|n| n.text().to_string().into()),
        cst::Value::ListValue(l) => l
            .values()
            .map(|v| parse_value(&v))
            .collect::<Option<_>>()
            .map(Value::Array),
        cst::Value::ObjectValue(o) => o
            .object_fields()
            .map(|field| match (field.name(), field.value()) {
                (Some(name), Some(value)) => {
                    parse_value(&value).map(|v| (name.text().to_string().into(), v))
                }
                _ => None,
            })
            .collect::<Option<_>>()
            .map(Value::Object),
    }
}

/// One-based line and column of a byte offset in the document.
pub(crate) fn location(source: &str, offset: usize) -> Location {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|last_line| last_line.chars().count())
        .unwrap_or_default()
        + 1;
    Location {
        line: line as u32,
        column: column as u32,
    }
}
