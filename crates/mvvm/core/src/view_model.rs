//! The contract a view-model type fulfils to be materialized into a store.
use std::any::Any;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::schema::SchemaBuilder;
use crate::state::{ServiceRef, StateEntry, Value, short_type_name};
use crate::token::TokenDescriptor;

/// A view-model: plain-data fields become store state, the declared schema
/// supplies derived values and operations, and constructor dependencies are
/// resolved by the DI container.
///
/// ```ignore
/// struct Counter { count: i64 }
///
/// impl ViewModel for Counter {
///     const NAME: &'static str = "Counter";
///
///     fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
///         Ok(Self { count: 0 })
///     }
///
///     fn fields(self) -> Fields {
///         Fields::new().data("count", self.count)
///     }
///
///     fn schema(builder: &mut SchemaBuilder) {
///         builder.action("increment", |ctx, _| {
///             let count = ctx.state().i64("count")?;
///             ctx.set("count", count + 1);
///             Ok(Value::Null)
///         });
///     }
/// }
/// ```
pub trait ViewModel: Sized + Send + Sync + 'static {
    /// Class identity; also the store id and the hydration payload key.
    ///
    /// Must be unique among view-models materialized in one context.
    const NAME: &'static str;

    /// Constructor parameter tokens, in parameter order.
    fn dependencies() -> Vec<TokenDescriptor> {
        Vec::new()
    }

    /// Builds an instance from the resolved dependencies.
    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError>;

    /// Consumes the instance into its fields, in declaration order.
    fn fields(self) -> Fields;

    /// Declares derived values, operations and lifecycle capabilities.
    fn schema(builder: &mut SchemaBuilder);
}

/// Dependencies resolved for one constructor call, indexed by parameter.
#[derive(Debug)]
pub struct Dependencies {
    class: &'static str,
    resolved: Vec<Option<ServiceRef>>,
}

impl Dependencies {
    pub fn new(class: &'static str, resolved: Vec<ServiceRef>) -> Self {
        Self {
            class,
            resolved: resolved.into_iter().map(Some).collect(),
        }
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Takes the dependency at `index` as a `T`.
    pub fn take<T: Any + Send + Sync>(&mut self, index: usize) -> Result<Arc<T>, ResolveError> {
        let service = self
            .resolved
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ResolveError::MissingParameter {
                class: self.class,
                index,
            })?;
        let found = service.type_name();
        service
            .downcast::<T>()
            .ok_or_else(|| ResolveError::TypeMismatch {
                token: format!("{}[{}]", self.class, index),
                expected: short_type_name::<T>(),
                found,
            })
    }
}

/// Instance fields extracted from a view-model.
#[derive(Clone, Debug, Default)]
pub struct Fields {
    entries: Vec<(String, StateEntry)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain-data field.
    pub fn data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((name.into(), StateEntry::Plain(value.into())));
        self
    }

    /// A field holding a live object. Whether it is an injected service is
    /// decided later by the serialization filter.
    pub fn object<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: Arc<T>) -> Self {
        self.entries
            .push((name.into(), StateEntry::Live(ServiceRef::new(value))));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateEntry)> + '_ {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

impl IntoIterator for Fields {
    type Item = (String, StateEntry);
    type IntoIter = std::vec::IntoIter<(String, StateEntry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Logger;

    #[test]
    fn test_take_dependency_once() {
        let mut deps = Dependencies::new("Greeter", vec![ServiceRef::new(Arc::new(Logger))]);

        assert!(deps.take::<Logger>(0).is_ok());
        assert!(matches!(
            deps.take::<Logger>(0),
            Err(ResolveError::MissingParameter { index: 0, .. })
        ));
    }

    #[test]
    fn test_take_wrong_type() {
        let mut deps = Dependencies::new("Greeter", vec![ServiceRef::new(Arc::new(Logger))]);

        let err = deps.take::<String>(0).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::TypeMismatch { expected: "String", found: "Logger", .. }
        ));
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let fields = Fields::new()
            .data("name", "a")
            .object("logger", Arc::new(Logger))
            .data("count", 0);

        let names: Vec<_> = fields.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "logger", "count"]);
        assert!(matches!(fields.iter().nth(1), Some((_, StateEntry::Live(_)))));
    }
}
