//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json::Value`].
pub trait ValueExt {
    /// Returns whether this value is an integer that fits the GraphQL `Int` scalar (32 bits).
    ///
    /// Spec: https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
    fn is_valid_int_input(&self) -> bool;

    /// Returns whether this value can be coerced to a GraphQL `Float`. Integers are accepted.
    ///
    /// Spec: https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
    fn is_valid_float_input(&self) -> bool;
}

impl ValueExt for Value {
    fn is_valid_int_input(&self) -> bool {
        self.as_i64()
            .map(|i| i32::try_from(i).is_ok())
            .unwrap_or_default()
    }

    fn is_valid_float_input(&self) -> bool {
        // we don't accept non-finite values, they cannot be represented in JSON
        self.as_f64().map(f64::is_finite).unwrap_or_default()
    }
}

/// A path element of a GraphQL response, either an output key or a list index.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index in a list.
    Index(usize),

    /// A key in an object.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A path into the `data` of a GraphQL response.
///
/// Serialized the way the GraphQL specification expects error paths:
/// `["history", 0, "id"]`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn from_slice<T: AsRef<str>>(s: &[T]) -> Self {
        Self(
            s.iter()
                .map(|x| x.as_ref())
                .map(|s| {
                    s.parse::<usize>()
                        .map(PathElement::Index)
                        .unwrap_or_else(|_| PathElement::Key(s.to_string()))
                })
                .collect(),
        )
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}
