//! Detached Task Spawning
//!
//! Fire-and-forget tasks with panic containment.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawns `task` on the current runtime, decoupled from the caller.
///
/// A panic inside the task is caught, logged with the task name and dropped.
/// No timeout is imposed. The returned handle resolves once the task (or its
/// panic) is done; callers normally ignore it.
///
/// # Example
/// ```ignore
/// spawn_detached("cache-persist", async move {
///     store.set(&key, entry).await.ok();
/// });
/// ```
pub fn spawn_detached<F>(name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
            error!(
                task = name,
                panic = %panic_message(panic.as_ref()),
                "background task panicked"
            );
        }
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_detached_task_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let handle = spawn_detached("test-run", async move {
            flag.store(true, Ordering::SeqCst);
        });

        handle.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_detached_task_panic_is_contained() {
        let handle = spawn_detached("test-panic", async {
            panic!("boom");
        });

        // The join handle completes normally: the panic never escapes
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_panic_message_variants() {
        let borrowed: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(borrowed.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
