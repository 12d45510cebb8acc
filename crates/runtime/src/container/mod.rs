//! Dependency-injection container.
//!
//! The container owns three kinds of registrations:
//! - service providers keyed by [`InjectionToken`] (instances or factories)
//! - transforms applied to a resolved dependency before injection
//! - view-model registrations, whose constructor tokens are recorded in the
//!   container's [`MetadataRegistry`]
//!
//! Registration happens through `&mut self` while the container is being
//! assembled; resolution only needs `&self`, so a finished container is shared
//! behind an `Arc` by every context built from it.
mod provider;

pub use provider::{Lifetime, ResolvedViewModel, Transform, VmScope};

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use mvvm_core::{
    InjectionMetadata, InjectionToken, MetadataRegistry, ResolveError, SchemaBuilder, ServiceRef,
    TokenDescriptor, ViewModel,
};
use provider::{FactoryFn, Provider, ViewModelRegistration};

#[derive(Default)]
pub struct Container {
    providers: HashMap<InjectionToken, Provider>,
    transforms: HashMap<InjectionToken, Arc<dyn Transform>>,
    singletons: RwLock<HashMap<InjectionToken, ServiceRef>>,
    metadata: RwLock<MetadataRegistry>,
    view_models: RwLock<HashMap<TypeId, ViewModelRegistration>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made instance under the token of `T`.
    pub fn register_instance<T: Any + Send + Sync>(&mut self, service: Arc<T>) -> &mut Self {
        self.register_instance_as(InjectionToken::of::<T>(), ServiceRef::new(service))
    }

    pub fn register_instance_as(&mut self, token: InjectionToken, service: ServiceRef) -> &mut Self {
        tracing::debug!(target: "mvvm::container", token = %token, "registered instance");
        self.providers.insert(token, Provider::Instance(service));
        self
    }

    /// Registers a factory building `T`, invoked per `lifetime`.
    pub fn register_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    {
        self.register_factory_as(InjectionToken::of::<T>(), lifetime, move |container| {
            factory(container).map(ServiceRef::new)
        })
    }

    pub fn register_factory_as<F>(
        &mut self,
        token: InjectionToken,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&Container) -> Result<ServiceRef, ResolveError> + Send + Sync + 'static,
    {
        tracing::debug!(target: "mvvm::container", token = %token, ?lifetime, "registered factory");
        let factory: FactoryFn = Arc::new(factory);
        self.providers
            .insert(token, Provider::Factory { factory, lifetime });
        self
    }

    pub fn register_transform(
        &mut self,
        token: InjectionToken,
        transform: impl Transform + 'static,
    ) -> &mut Self {
        self.transforms.insert(token, Arc::new(transform));
        self
    }

    /// Registers `V` and records its constructor tokens as injection metadata.
    ///
    /// Registering the same type again replaces the earlier registration.
    pub fn register_view_model<V: ViewModel>(&mut self, scope: VmScope) -> &mut Self {
        let registration = Self::registration_for::<V>(scope);
        let metadata = self
            .metadata
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        Self::define_dependencies::<V>(metadata);

        self.view_models
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<V>(), registration);
        self
    }

    pub fn is_registered(&self, token: &InjectionToken) -> bool {
        self.providers.contains_key(token)
    }

    pub fn has_view_model<V: ViewModel>(&self) -> bool {
        self.view_models
            .read()
            .map(|view_models| view_models.contains_key(&TypeId::of::<V>()))
            .unwrap_or(false)
    }

    /// Injection metadata recorded for `class`, if any.
    pub fn metadata(&self, class: &str) -> Result<Option<InjectionMetadata>, ResolveError> {
        let metadata = self
            .metadata
            .read()
            .map_err(|_| ResolveError::LockPoisoned)?;
        Ok(metadata.lookup(class).cloned())
    }

    /// Injected token names recorded for `class`.
    pub fn injected_names(&self, class: &str) -> Result<BTreeSet<String>, ResolveError> {
        let metadata = self
            .metadata
            .read()
            .map_err(|_| ResolveError::LockPoisoned)?;
        Ok(metadata.injected_names(class))
    }

    /// Resolves the service registered under the token of `T`.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        let descriptor = TokenDescriptor::of::<T>();
        let service = self.resolve_token(&descriptor)?;
        let found = service.type_name();
        service
            .downcast::<T>()
            .ok_or_else(|| ResolveError::TypeMismatch {
                token: descriptor.token().to_string(),
                expected: mvvm_core::short_type_name::<T>(),
                found,
            })
    }

    /// Resolves one constructor parameter, applying its transform if declared.
    pub fn resolve_token(&self, descriptor: &TokenDescriptor) -> Result<ServiceRef, ResolveError> {
        let token = descriptor.token();
        let provider = self
            .providers
            .get(token)
            .cloned()
            .ok_or_else(|| ResolveError::MissingProvider {
                token: token.to_string(),
            })?;

        let service = match provider {
            Provider::Instance(service) => service,
            Provider::Factory {
                factory,
                lifetime: Lifetime::Transient,
            } => factory(self)?,
            Provider::Factory {
                factory,
                lifetime: Lifetime::Singleton,
            } => self.resolve_singleton(token, &factory)?,
        };

        match descriptor.transform() {
            None => Ok(service),
            Some(transform) => {
                let transformer = self.transforms.get(&transform.transform).ok_or_else(|| {
                    ResolveError::MissingTransform {
                        token: transform.transform.to_string(),
                    }
                })?;
                tracing::trace!(
                    target: "mvvm::container",
                    token = %token,
                    transform = %transform.transform,
                    "applying transform"
                );
                transformer.transform(service, &transform.args)
            }
        }
    }

    /// Constructs `V` with its dependencies resolved.
    ///
    /// An unregistered view-model is auto-registered with
    /// [`VmScope::Component`]. Screen-scoped view-models are constructed once;
    /// later resolutions reuse the first instance's fields.
    pub fn resolve_view_model<V: ViewModel>(&self) -> Result<ResolvedViewModel, ResolveError> {
        let (schema, scope, cached) = self.view_model_entry::<V>()?;
        if let Some(fields) = cached {
            tracing::trace!(target: "mvvm::container", class = V::NAME, "reused screen instance");
            return Ok(ResolvedViewModel {
                class: V::NAME,
                type_id: TypeId::of::<V>(),
                fields,
                schema,
            });
        }

        // Descriptors are copied out so factories may resolve recursively
        // without the metadata lock held.
        let descriptors: Vec<TokenDescriptor> = self
            .metadata(V::NAME)?
            .map(|metadata| {
                metadata
                    .iter()
                    .map(|(_, descriptor)| descriptor.clone())
                    .collect()
            })
            .unwrap_or_default();

        let resolved = descriptors
            .iter()
            .map(|descriptor| self.resolve_token(descriptor))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dependencies = mvvm_core::Dependencies::new(V::NAME, resolved);
        let fields = V::construct(&mut dependencies)?.fields();
        tracing::debug!(
            target: "mvvm::container",
            class = V::NAME,
            dependencies = descriptors.len(),
            "constructed view-model"
        );

        if scope == VmScope::Screen {
            let mut view_models = self
                .view_models
                .write()
                .map_err(|_| ResolveError::LockPoisoned)?;
            if let Some(registration) = view_models.get_mut(&TypeId::of::<V>()) {
                registration.screen_fields.get_or_insert_with(|| fields.clone());
            }
        }

        Ok(ResolvedViewModel {
            class: V::NAME,
            type_id: TypeId::of::<V>(),
            fields,
            schema,
        })
    }

    fn view_model_entry<V: ViewModel>(
        &self,
    ) -> Result<(Arc<mvvm_core::Schema>, VmScope, Option<mvvm_core::Fields>), ResolveError> {
        {
            let view_models = self
                .view_models
                .read()
                .map_err(|_| ResolveError::LockPoisoned)?;
            if let Some(registration) = view_models.get(&TypeId::of::<V>()) {
                return Ok((
                    registration.schema.clone(),
                    registration.scope,
                    registration.screen_fields.clone(),
                ));
            }
        }

        tracing::debug!(target: "mvvm::container", class = V::NAME, "auto-registering view-model");
        {
            let mut metadata = self
                .metadata
                .write()
                .map_err(|_| ResolveError::LockPoisoned)?;
            Self::define_dependencies::<V>(&mut metadata);
        }

        let mut view_models = self
            .view_models
            .write()
            .map_err(|_| ResolveError::LockPoisoned)?;
        let registration = view_models
            .entry(TypeId::of::<V>())
            .or_insert_with(|| Self::registration_for::<V>(VmScope::Component));
        Ok((
            registration.schema.clone(),
            registration.scope,
            registration.screen_fields.clone(),
        ))
    }

    fn resolve_singleton(
        &self,
        token: &InjectionToken,
        factory: &FactoryFn,
    ) -> Result<ServiceRef, ResolveError> {
        if let Some(service) = self
            .singletons
            .read()
            .map_err(|_| ResolveError::LockPoisoned)?
            .get(token)
        {
            return Ok(service.clone());
        }

        let built = factory(self)?;
        let mut singletons = self
            .singletons
            .write()
            .map_err(|_| ResolveError::LockPoisoned)?;
        // A concurrent resolution may have won the race; keep its instance.
        Ok(singletons.entry(token.clone()).or_insert(built).clone())
    }

    fn registration_for<V: ViewModel>(scope: VmScope) -> ViewModelRegistration {
        let mut builder = SchemaBuilder::new();
        V::schema(&mut builder);
        ViewModelRegistration {
            class: V::NAME,
            scope,
            schema: Arc::new(builder.build()),
            screen_fields: None,
        }
    }

    fn define_dependencies<V: ViewModel>(metadata: &mut MetadataRegistry) {
        for (index, descriptor) in V::dependencies().into_iter().enumerate() {
            metadata.define(V::NAME, index, descriptor);
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view_models: Vec<&'static str> = self
            .view_models
            .read()
            .map(|view_models| view_models.values().map(|r| r.class).collect())
            .unwrap_or_default();
        f.debug_struct("Container")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("view_models", &view_models)
            .finish()
    }
}
