//! Injection tokens and the per-class injection metadata registry.
//!
//! Every constructor parameter of a view-model that is supplied by the DI
//! container is recorded here as `class -> parameter index -> token`. The
//! recorded token names are later compared with the type names of live field
//! values to tell services apart from plain data.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Value, short_type_name};

/// Identifies a dependency a constructor parameter requires.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InjectionToken {
    name: String,
}

impl InjectionToken {
    /// Token named after the short type name of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::named(short_type_name::<T>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A transform applied to the resolved value of a token before injection.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformDescriptor {
    pub transform: InjectionToken,
    pub args: Vec<Value>,
}

/// What a single constructor parameter requires.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenDescriptor {
    token: InjectionToken,
    transform: Option<TransformDescriptor>,
    injected: bool,
}

impl TokenDescriptor {
    pub fn new(token: InjectionToken) -> Self {
        Self {
            token,
            transform: None,
            injected: false,
        }
    }

    pub fn of<T: ?Sized>() -> Self {
        Self::new(InjectionToken::of::<T>())
    }

    pub fn with_transform(mut self, transform: InjectionToken, args: Vec<Value>) -> Self {
        self.transform = Some(TransformDescriptor { transform, args });
        self
    }

    pub fn token(&self) -> &InjectionToken {
        &self.token
    }

    pub fn transform(&self) -> Option<&TransformDescriptor> {
        self.transform.as_ref()
    }

    /// Set once the descriptor has been recorded through
    /// [`MetadataRegistry::define`]; marks the token as a service dependency.
    pub fn is_injected(&self) -> bool {
        self.injected
    }
}

impl From<InjectionToken> for TokenDescriptor {
    fn from(token: InjectionToken) -> Self {
        Self::new(token)
    }
}

/// Parameter index to token mapping for one class.
#[derive(Clone, Debug, Default)]
pub struct InjectionMetadata {
    params: BTreeMap<usize, TokenDescriptor>,
}

impl InjectionMetadata {
    pub fn get(&self, index: usize) -> Option<&TokenDescriptor> {
        self.params.get(&index)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Descriptors in parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TokenDescriptor)> + '_ {
        self.params.iter().map(|(index, descriptor)| (*index, descriptor))
    }

    /// Names of every token recorded as an injected dependency.
    pub fn injected_names(&self) -> BTreeSet<&str> {
        self.params
            .values()
            .filter(|descriptor| descriptor.is_injected())
            .map(|descriptor| descriptor.token.name())
            .collect()
    }
}

/// Class-level injection metadata, keyed by class name.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: HashMap<&'static str, InjectionMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that constructing `class` requires `descriptor` at `index`.
    ///
    /// Redefining an index replaces the previous descriptor.
    pub fn define(
        &mut self,
        class: &'static str,
        index: usize,
        descriptor: impl Into<TokenDescriptor>,
    ) {
        let mut descriptor = descriptor.into();
        descriptor.injected = true;
        self.classes
            .entry(class)
            .or_default()
            .params
            .insert(index, descriptor);
    }

    pub fn lookup(&self, class: &str) -> Option<&InjectionMetadata> {
        self.classes.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Injected token names for `class`; empty if nothing was defined.
    pub fn injected_names(&self, class: &str) -> BTreeSet<String> {
        self.lookup(class)
            .map(|metadata| {
                metadata
                    .injected_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
