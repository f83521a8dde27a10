//! Error classification
//!
//! Decides the public code and message for a failed request. Structured
//! [`RpcError`]s pass through untouched, validation failures become
//! `Invalid params`, and everything else is handed to the application's
//! [`ErrorMapper`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, warn};

use crate::config::DispatcherConfig;
use crate::error::{BoxError, HandlerError, JsonRpcErrorObject, RpcError};

/// Application hook deciding how unclassified failures are reported.
#[async_trait]
pub trait ErrorMapper: Send + Sync {
    async fn map_error(&self, failure: BoxError) -> RpcError;
}

/// Reports every unclassified failure as a bare `Internal error`, keeping
/// handler internals out of replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorMapper;

#[async_trait]
impl ErrorMapper for DefaultErrorMapper {
    async fn map_error(&self, _failure: BoxError) -> RpcError {
        warn!("Unclassified handler failure reported as internal error");
        RpcError::internal("Internal error")
    }
}

/// Error mapper backed by an async closure.
pub struct FnErrorMapper<F> {
    map_fn: F,
}

pub fn error_mapper_fn<F, Fut>(map_fn: F) -> FnErrorMapper<F>
where
    F: Fn(BoxError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcError> + Send + 'static,
{
    FnErrorMapper { map_fn }
}

#[async_trait]
impl<F, Fut> ErrorMapper for FnErrorMapper<F>
where
    F: Fn(BoxError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcError> + Send + 'static,
{
    async fn map_error(&self, failure: BoxError) -> RpcError {
        (self.map_fn)(failure).await
    }
}

#[derive(Clone)]
pub struct ErrorClassifier {
    mapper: Arc<dyn ErrorMapper>,
    config: DispatcherConfig,
}

impl ErrorClassifier {
    pub fn new(mapper: Arc<dyn ErrorMapper>, config: DispatcherConfig) -> Self {
        Self { mapper, config }
    }

    pub async fn classify(&self, failure: HandlerError) -> JsonRpcErrorObject {
        match failure {
            HandlerError::Rpc(rpc_error) => rpc_error.into(),
            HandlerError::Validation(validation)
                if self.config.validation_errors_as_invalid_params =>
            {
                JsonRpcErrorObject::invalid_params(validation.message())
            }
            HandlerError::Validation(validation) => {
                self.map_unclassified(Box::new(validation)).await
            }
            HandlerError::Failure(failure) => self.map_unclassified(failure).await,
        }
    }

    /// Hardcoded reply for failures that are not error values, such as a
    /// handler panic. The error mapper is never consulted.
    pub fn fallback(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::internal_error(Some(self.config.internal_error_message.clone()))
    }

    async fn map_unclassified(&self, failure: BoxError) -> JsonRpcErrorObject {
        match AssertUnwindSafe(self.mapper.map_error(failure))
            .catch_unwind()
            .await
        {
            Ok(rpc_error) => rpc_error.into(),
            Err(_) => {
                error!("Error mapper panicked, using internal error fallback");
                self.fallback()
            }
        }
    }
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
