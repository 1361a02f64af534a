//! Dispatch from root fields to their handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FieldError;
use crate::json_ext::Value;
use crate::spec::Arguments;
use crate::spec::OperationKind;

/// A root field handler: receives the user context and the coerced arguments.
pub type Resolver<C> = Arc<dyn Fn(&C, &Arguments) -> Result<Value, FieldError> + Send + Sync>;

/// Handlers for the root fields, keyed by operation kind and field name.
///
/// The argument shape of each handler is the one declared by the root type's field definition;
/// the executor checks both sides agree when it is built.
pub struct ResolverTable<C> {
    resolvers: HashMap<(OperationKind, String), Resolver<C>>,
}

impl<C> Default for ResolverTable<C> {
    fn default() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for ResolverTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverTable")
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ResolverTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a root field, replacing any previous one.
    pub fn register<F>(
        &mut self,
        kind: OperationKind,
        field: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&C, &Arguments) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        self.resolvers
            .insert((kind, field.into()), Arc::new(handler));
        self
    }

    /// Finds the handler for a root field.
    pub fn dispatch(&self, kind: OperationKind, field: &str) -> Result<&Resolver<C>, FieldError> {
        self.resolvers
            .get(&(kind, field.to_string()))
            .ok_or_else(|| FieldError::UnknownField {
                field: field.to_string(),
                ty: kind.root_type_name().to_string(),
            })
    }

    pub fn contains(&self, kind: OperationKind, field: &str) -> bool {
        self.resolvers.contains_key(&(kind, field.to_string()))
    }

    /// Registered root fields.
    pub fn fields(&self) -> impl Iterator<Item = (OperationKind, &str)> {
        self.resolvers
            .keys()
            .map(|(kind, field)| (*kind, field.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn query_and_mutation_namespaces_are_distinct() {
        let mut table = ResolverTable::<u32>::new();
        table
            .register(OperationKind::Query, "value", |ctx, _| Ok(json!(*ctx)))
            .register(OperationKind::Mutation, "reset", |_, _| Ok(json!(0)));

        let value = table.dispatch(OperationKind::Query, "value").unwrap();
        assert_eq!(value(&42, &Arguments::default()), Ok(json!(42)));

        assert_eq!(
            table.dispatch(OperationKind::Query, "reset").err(),
            Some(FieldError::UnknownField {
                field: "reset".to_string(),
                ty: "Query".to_string()
            })
        );
        assert!(table.contains(OperationKind::Mutation, "reset"));
        assert_eq!(table.fields().count(), 2);
    }
}
