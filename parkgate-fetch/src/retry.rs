//! Retry strategies for remote operations.

use std::time::Duration;

/// Attempts made before a fee lookup gives up.
pub const FEE_QUOTE_ATTEMPTS: u32 = 3;

/// Pause between fee lookup attempts.
pub const FEE_QUOTE_DELAY: Duration = Duration::from_secs(1);

/// Reconnects the push feed tries before going terminal.
pub const FEED_RECONNECT_ATTEMPTS: u32 = 5;

/// Pause between push feed reconnects.
pub const FEED_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryStrategy {
    /// Creates a strategy with a constant pause.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Fee lookup policy: three tries, one second apart.
    pub fn fee_quote() -> Self {
        Self::fixed(FEE_QUOTE_ATTEMPTS, FEE_QUOTE_DELAY)
    }

    /// Push feed policy: five reconnects, three seconds apart.
    pub fn feed_reconnect() -> Self {
        Self::fixed(FEED_RECONNECT_ATTEMPTS, FEED_RECONNECT_DELAY)
    }
}
