//! # Cancellation
//!
//! A cloneable token handed to the blocking toolchain calls (`compile`, `verify`).
//! It trips either when [`CancelToken::cancel`] is called from any clone or when
//! its optional deadline passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only trips when cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Builds a token from an optional timeout in seconds (config shape).
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(s) => Self::with_timeout(Duration::from_secs(s)),
            None => Self::new(),
        }
    }

    /// Trips the token for every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Human readable reason, used in error messages.
    pub fn reason(&self) -> &'static str {
        if self.flag.load(Ordering::SeqCst) {
            "cancelled by caller"
        } else {
            "deadline exceeded"
        }
    }
}
