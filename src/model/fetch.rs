//! Lazy, cached, single-flight fetch slots.
//!
//! A [`FetchSlot`] guards the cached content of one record. The first
//! caller that finds it empty starts the fetch; callers arriving while it
//! is in flight join it; every joined caller receives the same outcome.
//! A failed fetch leaves the slot retryable.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// ContentState
// ============================================================================

/// Observable state of a fetch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentState {
    /// Never requested.
    NotFetched,
    /// A fetch is in flight.
    Fetching,
    /// Content cached.
    Loaded,
    /// Last fetch failed; the next request retries.
    Failed,
}

impl ContentState {
    /// Returns `true` if content is cached.
    #[inline]
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl fmt::Display for ContentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFetched => "not-fetched",
            Self::Fetching => "fetching",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// FetchSlot
// ============================================================================

/// Receiver side of a joined fetch.
pub(crate) type FetchReceiver<T> = oneshot::Receiver<Result<T>>;

/// Cache slot with its in-flight waiters.
#[derive(Debug)]
pub(crate) enum FetchSlot<T> {
    NotFetched,
    Fetching(Vec<oneshot::Sender<Result<T>>>),
    Loaded(T),
    Failed(String),
}

/// What a caller must do after [`FetchSlot::begin`].
pub(crate) enum Begin<T> {
    /// Content is cached.
    Ready(T),
    /// A fetch is already running; wait on the receiver.
    Join(FetchReceiver<T>),
    /// The caller must start the fetch, then wait on the receiver.
    Start(FetchReceiver<T>),
}

impl<T> Default for FetchSlot<T> {
    fn default() -> Self {
        Self::NotFetched
    }
}

impl<T: Clone> FetchSlot<T> {
    /// Returns the observable state.
    pub(crate) fn state(&self) -> ContentState {
        match self {
            Self::NotFetched => ContentState::NotFetched,
            Self::Fetching(_) => ContentState::Fetching,
            Self::Loaded(_) => ContentState::Loaded,
            Self::Failed(_) => ContentState::Failed,
        }
    }

    /// Returns the cached content, if any.
    pub(crate) fn cached(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the last failure message, if the slot is failed.
    pub(crate) fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Registers a caller.
    ///
    /// From not-fetched or failed the slot moves to fetching and the caller
    /// is told to start the fetch.
    pub(crate) fn begin(&mut self) -> Begin<T> {
        match self {
            Self::Loaded(value) => Begin::Ready(value.clone()),
            Self::Fetching(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Begin::Join(rx)
            }
            Self::NotFetched | Self::Failed(_) => {
                let (tx, rx) = oneshot::channel();
                *self = Self::Fetching(vec![tx]);
                Begin::Start(rx)
            }
        }
    }

    /// Settles an in-flight fetch and wakes every waiter.
    ///
    /// `target` labels the error handed to waiters on failure. A slot that
    /// is not fetching is left untouched.
    pub(crate) fn complete(&mut self, target: &str, result: Result<T>) {
        let Self::Fetching(waiters) = self else {
            trace!(target, "Completion for idle slot ignored");
            return;
        };
        let waiters = std::mem::take(waiters);

        match result {
            Ok(value) => {
                for tx in waiters {
                    let _ = tx.send(Ok(value.clone()));
                }
                *self = Self::Loaded(value);
            }
            Err(e) => {
                let message = e.to_string();
                for tx in waiters {
                    let _ = tx.send(Err(Error::fetch_failed(target, message.clone())));
                }
                *self = Self::Failed(message);
            }
        }
    }
}

/// Awaits a joined fetch.
///
/// A dropped sender means the owning record was cleared or replaced while
/// the fetch was in flight.
pub(crate) async fn wait<T>(rx: FetchReceiver<T>, target: &str) -> Result<T> {
    rx.await.map_err(|_| Error::superseded(target))?
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_then_join_share_result() {
        let mut slot = FetchSlot::<String>::default();
        assert_eq!(slot.state(), ContentState::NotFetched);

        let Begin::Start(first) = slot.begin() else {
            panic!("first caller must start");
        };
        let Begin::Join(second) = slot.begin() else {
            panic!("second caller must join");
        };
        assert_eq!(slot.state(), ContentState::Fetching);

        slot.complete("1", Ok("body".to_string()));
        assert_eq!(slot.state(), ContentState::Loaded);
        assert_eq!(slot.cached().map(String::as_str), Some("body"));

        assert_eq!(wait(first, "1").await.expect("first"), "body");
        assert_eq!(wait(second, "1").await.expect("second"), "body");

        assert!(matches!(slot.begin(), Begin::Ready(ref v) if v == "body"));
    }

    #[tokio::test]
    async fn test_failure_is_retryable() {
        let mut slot = FetchSlot::<String>::default();

        let Begin::Start(rx) = slot.begin() else {
            panic!("must start");
        };
        slot.complete("u", Err(Error::ConnectionClosed));

        assert_eq!(slot.state(), ContentState::Failed);
        assert_eq!(slot.failure(), Some("Connection closed"));
        let err = wait(rx, "u").await.expect_err("should fail");
        assert!(matches!(err, Error::FetchFailed { .. }));

        assert!(matches!(slot.begin(), Begin::Start(_)));
        assert_eq!(slot.state(), ContentState::Fetching);
    }

    #[tokio::test]
    async fn test_dropped_slot_supersedes_waiters() {
        let mut slot = FetchSlot::<String>::default();
        let Begin::Start(rx) = slot.begin() else {
            panic!("must start");
        };
        drop(slot);

        let err = wait(rx, "7").await.expect_err("should be superseded");
        assert!(matches!(err, Error::Superseded { .. }));
    }

    #[test]
    fn test_complete_on_idle_slot_is_ignored() {
        let mut slot = FetchSlot::<String>::Loaded("kept".to_string());
        slot.complete("x", Ok("other".to_string()));
        assert_eq!(slot.cached().map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_slot_debug_shows_state() {
        let mut slot = FetchSlot::<String>::default();
        assert_eq!(format!("{slot:?}"), "NotFetched");

        let _rx = slot.begin();
        assert!(format!("{slot:?}").starts_with("Fetching"));

        slot.complete("x", Ok("text".to_string()));
        assert_eq!(format!("{slot:?}"), "Loaded(\"text\")");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ContentState::NotFetched.to_string(), "not-fetched");
        assert_eq!(ContentState::Failed.to_string(), "failed");
        assert!(ContentState::Loaded.is_loaded());
    }
}
