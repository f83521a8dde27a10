//! # lite-rpc Prelude
//!
//! Re-exports of the types needed to register methods and dispatch requests.
//!
//! ```rust
//! use lite_rpc::prelude::*;
//! ```

pub use crate::classifier::{ErrorMapper, error_mapper_fn};
pub use crate::config::DispatcherConfig;
pub use crate::dispatcher::{Dispatcher, DispatcherBuilder};
pub use crate::error::{BoxError, HandlerError, JsonRpcErrorCode, RpcError};
pub use crate::registry::{MethodRegistry, RegistryError};
pub use crate::request::JsonRpcRequest;
pub use crate::response::JsonRpcMessage;
pub use crate::table::MethodTable;
pub use crate::types::RequestId;
pub use crate::validator::{ParamsValidator, ValidationError, typed, validator_fn};

// Standard error codes
pub use crate::error_codes::*;
