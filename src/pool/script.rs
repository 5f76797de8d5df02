//! Script caching: `{Unknown -> Loaded}`, reverting to `Unknown` on `NOSCRIPT`.

use redis::aio::ConnectionLike;
use redis::{FromRedisValue, RedisError, Script};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// A Lua script bound to its own load-state flag.
///
/// The actual `EVALSHA`-then-`EVAL`-on-`NOSCRIPT` dance is performed by
/// [`redis::Script::invoke_async`] — this wrapper does not re-implement
/// the wire protocol. It only tracks, locally, whether the script is
/// believed to be loaded on the server, so that the crate's own state
/// machine (`Unknown -> Loaded`, reverting to `Unknown` on `NoScriptError`)
/// is observable and testable without re-deriving it from wire traffic.
pub(crate) struct ScriptHandle {
    script: Script,
    loaded: AtomicBool,
}

impl ScriptHandle {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            script: Script::new(source),
            loaded: AtomicBool::new(false),
        }
    }

    /// `true` once this handle has observed a successful evaluation.
    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) async fn invoke<C, T>(&self, conn: &mut C, keys: &[&str], args: &[String]) -> Result<T, Error>
    where
        C: ConnectionLike + Send,
        T: FromRedisValue,
    {
        let mut invocation = self.script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        match invocation.invoke_async(conn).await {
            Ok(value) => {
                self.loaded.store(true, Ordering::Release);
                Ok(value)
            }
            Err(err) => {
                if is_noscript(&err) {
                    // redis::Script::invoke_async already retried via a full
                    // EVAL internally; reaching here with NoScriptError means
                    // that retry itself failed. Reflect the reset and
                    // surface the underlying store error.
                    self.loaded.store(false, Ordering::Release);
                }
                Err(Error::from(err))
            }
        }
    }
}

fn is_noscript(err: &RedisError) -> bool {
    err.kind() == redis::ErrorKind::NoScriptError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let handle = ScriptHandle::new("return 1");
        assert!(!handle.is_loaded());
    }
}
