use std::time::Duration;

/// Engine tuning knobs; defaults follow the protocol's customary values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    /// Lifetime of a built external message (`valid_until` distance).
    pub message_ttl: Duration,
    /// Fallback confirmation deadline when the caller supplies none, so a
    /// wait can never block forever.
    pub confirmation_timeout: Duration,
    /// Default scan depth of `find_transaction_by_in_msg_hash`.
    pub tx_scan_limit: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            message_ttl: Duration::from_secs(180),
            confirmation_timeout: Duration::from_secs(180),
            tx_scan_limit: 60,
        }
    }
}
