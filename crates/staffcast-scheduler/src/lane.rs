//! Scheduling lanes — two independent FIFO queues feeding one consumer.

/// Which queue a request lands in.
///
/// Both lanes drain through the same consumer loop. When both are ready at
/// once the pick between them is deliberately left to chance; this is an
/// accepted approximation of priority, not an ordering guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Lane {
    /// Interactive traffic: replies to users, menu updates.
    Normal,
    /// Deferrable traffic: bulk mailings, reports, operator notices.
    Low,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lane::Normal => write!(f, "normal"),
            Lane::Low => write!(f, "low"),
        }
    }
}
