//! Parameter validators.
//!
//! A validator turns the raw `params` member of a request into the typed value
//! a handler expects. Schema libraries plug in by implementing
//! [`ParamsValidator`]; [`Typed`] covers anything serde can deserialize.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Params were missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Capability that parses raw params into `Self::Params` or fails.
///
/// `raw` is `None` when the request carried no `params` member (or an
/// explicit `null`).
#[async_trait]
pub trait ParamsValidator: Send + Sync + 'static {
    type Params: Send + 'static;

    async fn parse(&self, raw: Option<Value>) -> Result<Self::Params, ValidationError>;
}

/// Deserializes params into `T` with serde. Missing params are treated as
/// `null`, so `Typed<Option<T>>` accepts requests without params.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Typed(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

/// Shorthand for [`Typed::new`].
pub fn typed<T>() -> Typed<T> {
    Typed::new()
}

#[async_trait]
impl<T> ParamsValidator for Typed<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Params = T;

    async fn parse(&self, raw: Option<Value>) -> Result<T, ValidationError> {
        Ok(serde_json::from_value(raw.unwrap_or(Value::Null))?)
    }
}

/// Validator backed by a synchronous closure.
pub struct FnValidator<F, P> {
    parse_fn: F,
    _params: PhantomData<fn() -> P>,
}

pub fn validator_fn<F, P>(parse_fn: F) -> FnValidator<F, P>
where
    F: Fn(Option<Value>) -> Result<P, ValidationError> + Send + Sync + 'static,
    P: Send + 'static,
{
    FnValidator {
        parse_fn,
        _params: PhantomData,
    }
}

#[async_trait]
impl<F, P> ParamsValidator for FnValidator<F, P>
where
    F: Fn(Option<Value>) -> Result<P, ValidationError> + Send + Sync + 'static,
    P: Send + 'static,
{
    type Params = P;

    async fn parse(&self, raw: Option<Value>) -> Result<P, ValidationError> {
        (self.parse_fn)(raw)
    }
}

/// Used for methods registered without a validator. Whatever the client sent
/// is ignored and the handler receives `()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParams;

#[async_trait]
impl ParamsValidator for NoParams {
    type Params = ();

    async fn parse(&self, _raw: Option<Value>) -> Result<(), ValidationError> {
        Ok(())
    }
}
