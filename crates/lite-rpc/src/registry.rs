//! Method registry
//!
//! A [`MethodRegistry`] is an immutable list of [`MethodDescriptor`]s. Every
//! `add` and `merge` returns a new registry; descriptors are shared through
//! `Arc`, so registries built at independent call sites can be combined
//! freely without affecting each other.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::HandlerError;
use crate::table::{MethodSignature, MethodTable};
use crate::validator::{NoParams, ParamsValidator};

/// Registration-time failures. These indicate a programming mistake and are
/// meant to stop startup, never to be turned into RPC replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Method '{0}' is already registered")]
    DuplicateMethod(String),

    #[error("Method '{0}' is registered but missing from the method table")]
    UnlistedMethod(String),

    #[error("Method '{0}' is listed in the method table but not registered")]
    MissingMethod(String),

    #[error("Method '{name}' has signature {actual}, method table expects {expected}")]
    SignatureMismatch {
        name: String,
        expected: MethodSignature,
        actual: MethodSignature,
    },
}

type MethodFn<C> =
    dyn Fn(C, Option<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync;

/// A registered method: its name, params/result signature and the erased
/// validate-then-invoke pipeline.
pub struct MethodDescriptor<C> {
    name: String,
    signature: MethodSignature,
    call: Arc<MethodFn<C>>,
}

impl<C> MethodDescriptor<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Validate `params` and run the handler. A handler returning `()` or
    /// `None` yields `Value::Null`.
    pub(crate) fn invoke(
        &self,
        context: C,
        params: Option<Value>,
    ) -> BoxFuture<'static, Result<Value, HandlerError>> {
        (*self.call)(context, params)
    }
}

impl<C> fmt::Debug for MethodDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Immutable collection of uniquely named methods.
///
/// `C` is the per-request context handed to every handler. Registries are
/// built during a single-threaded setup phase and only read afterwards.
pub struct MethodRegistry<C = ()> {
    methods: Vec<Arc<MethodDescriptor<C>>>,
}

impl<C> Clone for MethodRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

impl<C> Default for MethodRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for MethodRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

impl<C> MethodRegistry<C> {
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Read-only view of every registered descriptor
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor<C>> {
        self.methods.iter().map(|m| m.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor<C>> {
        self.methods().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Combine two registries into a new one. Neither input is modified.
    ///
    /// Fails if any name appears on both sides.
    pub fn merge(&self, other: &MethodRegistry<C>) -> Result<Self, RegistryError> {
        if let Some(duplicate) = other.methods().find(|m| self.contains(m.name())) {
            return Err(RegistryError::DuplicateMethod(duplicate.name.clone()));
        }

        let mut methods = Vec::with_capacity(self.len() + other.len());
        methods.extend(self.methods.iter().cloned());
        methods.extend(other.methods.iter().cloned());
        debug!(
            "Merged method registries ({} + {} methods)",
            self.len(),
            other.len()
        );
        Ok(Self { methods })
    }

    /// Check every registered method against an explicit signature table.
    ///
    /// Each table entry must be registered with the same params/result types,
    /// and every registered method must be listed.
    pub fn verify(&self, table: &MethodTable) -> Result<(), RegistryError> {
        for descriptor in self.methods() {
            let expected = table
                .get(descriptor.name())
                .ok_or_else(|| RegistryError::UnlistedMethod(descriptor.name.clone()))?;
            if expected != descriptor.signature() {
                return Err(RegistryError::SignatureMismatch {
                    name: descriptor.name.clone(),
                    expected: expected.clone(),
                    actual: descriptor.signature.clone(),
                });
            }
        }

        if let Some(missing) = table.names().find(|name| !self.contains(name)) {
            return Err(RegistryError::MissingMethod(missing.to_string()));
        }
        Ok(())
    }

    fn with_descriptor(&self, descriptor: MethodDescriptor<C>) -> Result<Self, RegistryError> {
        if self.contains(descriptor.name()) {
            return Err(RegistryError::DuplicateMethod(descriptor.name));
        }
        debug!(
            "Registered method '{}' ({})",
            descriptor.name, descriptor.signature
        );
        let mut methods = self.methods.clone();
        methods.push(Arc::new(descriptor));
        Ok(Self { methods })
    }
}

impl<C: Send + 'static> MethodRegistry<C> {
    /// Register a method whose params are parsed by `validator`.
    ///
    /// ```rust
    /// use lite_rpc::{MethodRegistry, RpcError, validator::typed};
    /// use serde_json::Value;
    ///
    /// let registry = MethodRegistry::<()>::new()
    ///     .add("echo", typed::<Value>(), |_ctx, params: Value| async move {
    ///         Ok::<_, RpcError>(params)
    ///     })
    ///     .unwrap();
    /// assert!(registry.contains("echo"));
    /// ```
    pub fn add<V, F, Fut, R, E>(
        &self,
        name: impl Into<String>,
        validator: V,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        V: ParamsValidator,
        F: Fn(C, V::Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: Into<HandlerError> + 'static,
    {
        let validator = Arc::new(validator);
        let handler = Arc::new(handler);
        let call = move |context: C, raw: Option<Value>| {
            let validator = Arc::clone(&validator);
            let handler = Arc::clone(&handler);
            let fut: BoxFuture<'static, Result<Value, HandlerError>> = Box::pin(async move {
                let params = validator.parse(raw).await?;
                let result = (*handler)(context, params).await.map_err(Into::into)?;
                Ok(serde_json::to_value(result)?)
            });
            fut
        };

        self.with_descriptor(MethodDescriptor {
            name: name.into(),
            signature: MethodSignature::of::<V::Params, R>(),
            call: Arc::new(call),
        })
    }

    /// Register a method that takes no params. Any `params` sent by the client
    /// are ignored.
    pub fn add_no_params<F, Fut, R, E>(
        &self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: Into<HandlerError> + 'static,
    {
        self.add(name, NoParams, move |context, ()| handler(context))
    }
}
