//! # lite-rpc
//!
//! A transport-agnostic JSON-RPC 2.0 request dispatcher.
//!
//! Methods are registered on an immutable [`MethodRegistry`] (each with a
//! params validator and an async handler), registries from independent places
//! are combined with [`MethodRegistry::merge`], and a [`Dispatcher`] routes
//! incoming requests to them.
//!
//! ## Features
//! - Duplicate method names are rejected when registering or merging
//! - Typed params through serde, or any custom [`ParamsValidator`]
//! - Notifications (requests without an `id`) never produce a reply
//! - Structured [`RpcError`]s are passed through; other failures go through an
//!   application supplied [`ErrorMapper`]
//! - Works with any transport: feed it a [`JsonRpcRequest`] or a raw string
//!
//! ```rust
//! use lite_rpc::{Dispatcher, JsonRpcRequest, MethodRegistry, RpcError, validator::typed};
//! use serde_json::{Value, json};
//!
//! # tokio_test::block_on(async {
//! let registry = MethodRegistry::<()>::new()
//!     .add("echo", typed::<Value>(), |_ctx, params: Value| async move {
//!         Ok::<_, RpcError>(params)
//!     })
//!     .unwrap();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let reply = dispatcher
//!     .process_request(JsonRpcRequest::new("rpc_1", "echo", Some(json!("hi"))))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.result(), Some(&json!("hi")));
//! # });
//! ```

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod table;
pub mod types;
pub mod validator;

// Re-export main types
pub use classifier::{DefaultErrorMapper, ErrorClassifier, ErrorMapper, error_mapper_fn};
pub use config::DispatcherConfig;
pub use dispatch::parse_request;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{
    BoxError, HandlerError, InvalidErrorCode, JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject,
    RpcError,
};
pub use registry::{MethodDescriptor, MethodRegistry, RegistryError};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use table::{MethodSignature, MethodTable};
pub use types::{JsonRpcVersion, RequestId};
pub use validator::{ParamsValidator, ValidationError};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Application error range: -32099 to -32000
    pub const APPLICATION_ERROR_START: i64 = -32099;
    pub const APPLICATION_ERROR_END: i64 = -32000;
}
