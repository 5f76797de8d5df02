//! The RAII permit handle returned by [`super::Semaphore::acquire`].

use std::sync::Arc;
use tracing::error;

use super::Inner;
use crate::error::Error;

/// An acquired semaphore permit.
///
/// Dropping the guard without calling [`SemaphoreGuard::release`] still
/// returns the permit: `Drop` spawns a detached task that runs the same
/// release script, provided a Tokio runtime is currently running (if none
/// is reachable, the permit is left for `expiry` to reclaim rather than
/// panicking the drop). Prefer calling `release()` explicitly so a release
/// failure can be observed by the caller instead of only logged.
pub struct SemaphoreGuard {
    inner: Arc<Inner>,
    token: Option<String>,
}

impl SemaphoreGuard {
    pub(super) fn new(inner: Arc<Inner>, token: String) -> Self {
        Self {
            inner,
            token: Some(token),
        }
    }

    /// The opaque permit token this guard holds, for diagnostics.
    pub fn token(&self) -> &str {
        self.token.as_deref().expect("token taken before drop")
    }

    /// Returns the permit to the queue, consuming the guard.
    ///
    /// Calling this is equivalent to letting the guard drop, except that
    /// the release is awaited inline and its result is returned to the
    /// caller rather than only logged.
    pub async fn release(mut self) -> Result<(), Error> {
        let token = self.token.take().expect("release called once");
        let semaphore = super::Semaphore(self.inner.clone());
        semaphore.release(&token).await
    }
}

impl Drop for SemaphoreGuard {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(
                token = %token,
                "semaphore guard dropped with no Tokio runtime reachable; \
                 permit left for expiry to reclaim"
            );
            return;
        };
        let inner = self.inner.clone();
        handle.spawn(async move {
            let semaphore = super::Semaphore(inner);
            if let Err(err) = semaphore.release(&token).await {
                error!(error = %err, token = %token, "failed to release semaphore permit on drop");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::SemaphoreBuilder;

    #[test]
    fn token_is_readable_before_release() {
        let semaphore = SemaphoreBuilder::new("guard-test", 1, "redis://127.0.0.1:6379")
            .build()
            .unwrap();
        let guard = super::SemaphoreGuard::new(semaphore.inner(), "tok-1".to_string());
        assert_eq!(guard.token(), "tok-1");
        // Dropped here with no Tokio runtime running: must not panic, since
        // `Drop` falls back to a log-and-return when `Handle::try_current()`
        // fails instead of unconditionally spawning.
    }
}
