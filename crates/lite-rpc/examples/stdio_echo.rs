//! Line-delimited stdio JSON-RPC server
//!
//! Reads one JSON-RPC request per line from stdin and writes one reply per
//! line to stdout. Notifications produce no output.
//!
//! ```text
//! $ echo '{"jsonrpc":"2.0","method":"add","params":{"a":5,"b":3},"id":"rpc_1"}' \
//!     | cargo run -p lite-rpc --example stdio_echo
//! {"jsonrpc":"2.0","id":"rpc_1","result":8.0}
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use lite_rpc::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

const DIVISION_BY_ZERO: i64 = -32001;

#[derive(Debug, Deserialize)]
struct AddParams {
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize)]
struct DivideParams {
    dividend: f64,
    divisor: f64,
}

/// Per-connection context handed to every handler
#[derive(Clone, Default)]
struct Session {
    requests_seen: Arc<AtomicU64>,
}

fn math_methods() -> Result<MethodRegistry<Session>> {
    let registry = MethodRegistry::new()
        .add("add", typed::<AddParams>(), |_session, p: AddParams| async move {
            Ok::<_, RpcError>(p.a + p.b)
        })?
        .add("divide", typed::<DivideParams>(), divide)?;
    Ok(registry)
}

async fn divide(_session: Session, p: DivideParams) -> Result<f64, HandlerError> {
    if p.divisor == 0.0 {
        let error = RpcError::application(DIVISION_BY_ZERO, "Division by zero")
            .map_err(HandlerError::failure)?;
        return Err(error.into());
    }
    Ok(p.dividend / p.divisor)
}

fn utility_methods() -> Result<MethodRegistry<Session>> {
    let registry = MethodRegistry::new()
        .add("echo", typed::<Value>(), |_session, p: Value| async move {
            Ok::<_, RpcError>(p)
        })?
        .add_no_params("stats", |session: Session| async move {
            Ok::<_, RpcError>(session.requests_seen.load(Ordering::Relaxed))
        })?
        .add("log", typed::<String>(), |_session, line: String| async move {
            info!("client says: {}", line);
            Ok::<_, RpcError>(())
        })?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let registry = math_methods()?.merge(&utility_methods()?)?;
    let dispatcher = Dispatcher::builder(registry)
        .method_table(
            MethodTable::new()
                .method::<AddParams, f64>("add")
                .method::<DivideParams, f64>("divide")
                .method::<Value, Value>("echo")
                .no_params::<u64>("stats")
                .method::<String, ()>("log"),
        )
        .build()?;
    info!("Serving {:?} on stdio", dispatcher.registry().names());

    let session = Session::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        session.requests_seen.fetch_add(1, Ordering::Relaxed);

        if let Some(reply) = dispatcher.process_str(&line, session.clone()).await {
            stdout.write_all(reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
