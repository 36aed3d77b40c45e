//! Failure isolation for the repeating loops.
//!
//! Neither loop has a fatal path: a tick that fails or panics is reported and
//! the loop carries on at its next scheduled tick. Task-level outcomes are
//! reported when the loops are joined at shutdown.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Drive one tick to completion, converting a panic into a logged `None`.
pub async fn catch_tick<T>(loop_name: &str, tick: impl Future<Output = T>) -> Option<T> {
    match AssertUnwindSafe(tick).catch_unwind().await {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(
                "Tick of the {} loop panicked, resuming on the next tick: {}",
                loop_name,
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

/// Await a loop task and report how it ended. Returns `true` on a clean exit.
pub async fn join_loop(loop_name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => {
            info!("The {} loop finished", loop_name);
            true
        }
        Err(e) if e.is_panic() => {
            error!(
                "The {} loop panicked: {}",
                loop_name,
                panic_message(e.into_panic().as_ref())
            );
            false
        }
        Err(e) => {
            warn!("The {} loop was aborted: {}", loop_name, e);
            false
        }
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
