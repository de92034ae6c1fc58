//! Blocking entry points over the async operations.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{ProviderError, Result};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Shared runtime for blocking calls. Pooled connections are bound to the
/// runtime that opened them, so every blocking call reuses this one.
fn runtime() -> Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tdserver-blocking")
        .enable_all()
        .build()?;
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Run `future` to completion on the shared runtime.
///
/// Fails when called from inside an async context, where blocking would
/// stall the caller's executor.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if Handle::try_current().is_ok() {
        return Err(ProviderError::Config(
            "blocking operation called from within an async runtime; use the async form".into(),
        ));
    }
    runtime()?.block_on(future)
}
