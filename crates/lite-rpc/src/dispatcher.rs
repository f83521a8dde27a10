//! Request dispatcher
//!
//! Routes a [`JsonRpcRequest`] through lookup, params validation and handler
//! invocation, and turns the outcome into a reply envelope. Notifications
//! never produce a reply, whatever happens while handling them.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::classifier::{DefaultErrorMapper, ErrorClassifier, ErrorMapper};
use crate::config::DispatcherConfig;
use crate::dispatch::parse_request;
use crate::error::JsonRpcErrorObject;
use crate::registry::{MethodRegistry, RegistryError};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;
use crate::table::MethodTable;

/// Dispatches requests against a frozen [`MethodRegistry`].
///
/// `process` keeps no state between calls, so a single dispatcher (usually
/// behind an `Arc`) can serve any number of concurrent requests.
pub struct Dispatcher<C = ()> {
    registry: MethodRegistry<C>,
    classifier: ErrorClassifier,
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("classifier", &self.classifier)
            .finish()
    }
}

impl<C: Send + 'static> Dispatcher<C> {
    /// Dispatcher with the default error mapper and configuration
    pub fn new(registry: MethodRegistry<C>) -> Self {
        Self {
            registry,
            classifier: ErrorClassifier::new(
                Arc::new(DefaultErrorMapper),
                DispatcherConfig::default(),
            ),
        }
    }

    pub fn builder(registry: MethodRegistry<C>) -> DispatcherBuilder<C> {
        DispatcherBuilder::new(registry)
    }

    pub fn registry(&self) -> &MethodRegistry<C> {
        &self.registry
    }

    /// Process one request. Returns `None` when no reply must be sent.
    pub async fn process(&self, request: JsonRpcRequest, context: C) -> Option<JsonRpcMessage> {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let Some(descriptor) = self.registry.get(&method) else {
            return match id {
                Some(id) => {
                    debug!("Method '{}' not found (id: {})", method, id);
                    Some(JsonRpcMessage::error(
                        Some(id),
                        JsonRpcErrorObject::method_not_found(),
                    ))
                }
                None => {
                    debug!("Ignoring notification for unknown method '{}'", method);
                    None
                }
            };
        };

        debug!("Dispatching '{}' (id: {:?})", method, id);
        let outcome = AssertUnwindSafe(descriptor.invoke(context, params))
            .catch_unwind()
            .await;

        let Some(id) = id else {
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(failure)) => {
                    warn!("Notification '{}' failed with {}", method, failure.kind());
                }
                Err(_) => error!("Notification handler '{}' panicked", method),
            }
            return None;
        };

        let message = match outcome {
            Ok(Ok(result)) => JsonRpcMessage::success(id, result),
            Ok(Err(failure)) => {
                debug!("Method '{}' failed with {} (id: {})", method, failure.kind(), id);
                let error = self.classifier.classify(failure).await;
                JsonRpcMessage::error(Some(id), error)
            }
            Err(_) => {
                error!("Handler for '{}' panicked (id: {})", method, id);
                JsonRpcMessage::error(Some(id), self.classifier.fallback())
            }
        };
        Some(message)
    }

    /// Decode a raw payload, process it and encode the reply.
    ///
    /// Payloads that cannot be decoded are answered with a parse or invalid
    /// request error, as a transport would expect.
    pub async fn process_str(&self, raw: &str, context: C) -> Option<String> {
        let message = match parse_request(raw) {
            Ok(request) => self.process(request, context).await?,
            Err(error) => JsonRpcMessage::Error(error),
        };

        match message.to_json_string() {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                None
            }
        }
    }
}

impl<C: Default + Send + 'static> Dispatcher<C> {
    /// Process a request with a default context
    pub async fn process_request(&self, request: JsonRpcRequest) -> Option<JsonRpcMessage> {
        self.process(request, C::default()).await
    }
}

/// Builder for [`Dispatcher`]s.
///
/// ```rust
/// use lite_rpc::{Dispatcher, MethodRegistry, MethodTable, RpcError};
///
/// let registry = MethodRegistry::<()>::new()
///     .add_no_params("ping", |_ctx| async { Ok::<_, RpcError>("pong") })
///     .unwrap();
///
/// let dispatcher = Dispatcher::builder(registry)
///     .method_table(MethodTable::new().no_params::<&'static str>("ping"))
///     .build()
///     .unwrap();
/// assert!(dispatcher.registry().contains("ping"));
/// ```
pub struct DispatcherBuilder<C = ()> {
    registry: MethodRegistry<C>,
    mapper: Arc<dyn ErrorMapper>,
    config: DispatcherConfig,
    table: Option<MethodTable>,
}

impl<C: Send + 'static> DispatcherBuilder<C> {
    pub fn new(registry: MethodRegistry<C>) -> Self {
        Self {
            registry,
            mapper: Arc::new(DefaultErrorMapper),
            config: DispatcherConfig::default(),
            table: None,
        }
    }

    /// Set the mapper used for unclassified failures
    pub fn error_mapper(mut self, mapper: impl ErrorMapper + 'static) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validation_errors_as_invalid_params(mut self, enabled: bool) -> Self {
        self.config.validation_errors_as_invalid_params = enabled;
        self
    }

    pub fn internal_error_message(mut self, message: impl Into<String>) -> Self {
        self.config.internal_error_message = message.into();
        self
    }

    /// Require the registry to match `table` exactly when building
    pub fn method_table(mut self, table: MethodTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn build(self) -> Result<Dispatcher<C>, RegistryError> {
        if let Some(table) = &self.table {
            self.registry.verify(table)?;
        }
        debug!(
            "Built dispatcher with {} methods: {:?}",
            self.registry.len(),
            self.registry.names()
        );
        Ok(Dispatcher {
            registry: self.registry,
            classifier: ErrorClassifier::new(self.mapper, self.config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, HandlerError, RpcError};
    use crate::types::RequestId;
    use crate::validator::typed;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn registry() -> MethodRegistry {
        MethodRegistry::new()
            .add("echo", typed::<Value>(), |_ctx, p: Value| async move {
                Ok::<_, RpcError>(p)
            })
            .unwrap()
            .add_no_params("fail", |_ctx| async {
                Err::<(), _>(RpcError::internal("boom"))
            })
            .unwrap()
            .add_no_params("explode", |_ctx| async {
                Err::<(), _>(HandlerError::failure("database unreachable"))
            })
            .unwrap()
            .add_no_params("panic", |_ctx| async {
                if true {
                    panic!("handler bug");
                }
                Ok::<_, RpcError>(())
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_success() {
        let dispatcher = Dispatcher::new(registry());
        let request = JsonRpcRequest::new("rpc_1", "echo", Some(json!("hi")));

        let reply = dispatcher.process_request(request).await.unwrap();
        assert_eq!(reply, JsonRpcMessage::success(RequestId::from("rpc_1"), json!("hi")));
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let dispatcher = Dispatcher::new(registry());
        let request = JsonRpcRequest::new_no_params("rpc_2", "missing");

        let reply = dispatcher.process_request(request).await.unwrap();
        let error = reply.error_object().unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
    }

    #[tokio::test]
    async fn test_application_error_is_verbatim() {
        let dispatcher = Dispatcher::new(registry());
        let reply = dispatcher
            .process_request(JsonRpcRequest::new_no_params("rpc_3", "fail"))
            .await
            .unwrap();
        let error = reply.error_object().unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.message, "boom");
    }

    #[tokio::test]
    async fn test_unclassified_failure_goes_to_mapper() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let dispatcher = Dispatcher::builder(registry())
            .error_mapper(crate::classifier::error_mapper_fn(move |failure: BoxError| {
                seen.fetch_add(1, Ordering::SeqCst);
                async move { RpcError::application(-32010, failure.to_string()).unwrap() }
            }))
            .build()
            .unwrap();

        let reply = dispatcher
            .process_request(JsonRpcRequest::new_no_params("rpc_4", "explode"))
            .await
            .unwrap();
        let error = reply.error_object().unwrap();
        assert_eq!(error.code, -32010);
        assert_eq!(error.message, "database unreachable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_uses_fallback_without_mapper() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let dispatcher = Dispatcher::builder(registry())
            .error_mapper(crate::classifier::error_mapper_fn(move |_failure: BoxError| {
                seen.fetch_add(1, Ordering::SeqCst);
                async { RpcError::internal("mapped") }
            }))
            .build()
            .unwrap();

        let reply = dispatcher
            .process_request(JsonRpcRequest::new_no_params("rpc_5", "panic"))
            .await
            .unwrap();
        let error = reply.error_object().unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.message, "Something went wrong");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let registry: MethodRegistry = MethodRegistry::new()
            .add("double", typed::<i64>(), |_ctx, n: i64| async move {
                Ok::<_, RpcError>(n * 2)
            })
            .unwrap();
        let dispatcher = Dispatcher::new(registry);

        let reply = dispatcher
            .process_request(JsonRpcRequest::new("rpc_6", "double", Some(json!("two"))))
            .await
            .unwrap();
        assert_eq!(reply.error_object().unwrap().code, -32602);

        let ok = dispatcher
            .process_request(JsonRpcRequest::new("rpc_7", "double", Some(json!(21))))
            .await
            .unwrap();
        assert_eq!(ok.result(), Some(&json!(42)));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_notifications_never_reply() {
        let dispatcher = Dispatcher::new(registry());

        for method in ["echo", "fail", "explode", "panic", "missing"] {
            let reply = dispatcher
                .process_request(JsonRpcRequest::notification(method, Some(json!(1))))
                .await;
            assert!(reply.is_none(), "notification '{}' produced a reply", method);
        }
        assert!(logs_contain("Notification 'fail' failed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rejected_params_stay_out_of_logs() {
        let registry: MethodRegistry = MethodRegistry::new()
            .add("count", typed::<i64>(), |_ctx, n: i64| async move {
                Ok::<_, RpcError>(n)
            })
            .unwrap();
        let dispatcher = Dispatcher::new(registry);

        let reply = dispatcher
            .process_request(JsonRpcRequest::new("rpc_8", "count", Some(json!("three"))))
            .await
            .unwrap();
        assert_eq!(reply.error_object().unwrap().code, -32602);
        let silent = dispatcher
            .process_request(JsonRpcRequest::notification("count", Some(json!("three"))))
            .await;
        assert!(silent.is_none());

        assert!(logs_contain("Method 'count' failed with validation error"));
        assert!(logs_contain("Notification 'count' failed with validation error"));
        assert!(!logs_contain("three"));
    }

    #[tokio::test]
    async fn test_notification_handler_runs_to_completion() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let registry: MethodRegistry = MethodRegistry::new()
            .add_no_params("tick", move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::task::yield_now().await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RpcError>(())
                }
            })
            .unwrap();
        let dispatcher = Dispatcher::new(registry);

        let reply = dispatcher
            .process_request(JsonRpcRequest::notification("tick", None))
            .await;
        assert!(reply.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_str() {
        let dispatcher = Dispatcher::new(registry());

        let reply = dispatcher
            .process_str(r#"{"jsonrpc":"2.0","method":"echo","params":"hi","id":"rpc_1"}"#, ())
            .await
            .unwrap();
        let reply: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply, json!({"jsonrpc": "2.0", "id": "rpc_1", "result": "hi"}));

        let parse_error = dispatcher.process_str("{not json", ()).await.unwrap();
        let parse_error: Value = serde_json::from_str(&parse_error).unwrap();
        assert_eq!(parse_error["id"], Value::Null);
        assert_eq!(parse_error["error"]["code"], -32700);

        let notification = dispatcher
            .process_str(r#"{"jsonrpc":"2.0","method":"fail"}"#, ())
            .await;
        assert!(notification.is_none());
    }

    #[test]
    fn test_builder_rejects_mismatched_table() {
        let result = Dispatcher::builder(registry())
            .method_table(MethodTable::new().method::<Value, Value>("echo"))
            .build();
        assert!(matches!(result, Err(RegistryError::UnlistedMethod(_))));
    }
}
