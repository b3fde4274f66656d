//! Registry configuration

/// Configuration for the subscriber registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each subscriber's delivery channel (in chunks).
    ///
    /// A subscriber that falls this many chunks behind starts losing
    /// chunks until it catches up.
    pub channel_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber channel capacity (minimum 1)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        // mpsc::channel panics on zero
        self.channel_capacity = capacity.max(1);
        self
    }
}
