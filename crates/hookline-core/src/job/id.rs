//! Job id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use hookline_types::job::JobId;
use uuid::Uuid;

/// Produces fresh job ids. Implementations must never repeat an id.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> JobId;
}

/// Time-ordered UUID v7 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> JobId {
        JobId::new()
    }
}

/// Ids `00000000-0000-0000-0000-000000000001`, `...002`, and so on.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> JobId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        JobId::from_uuid(Uuid::from_u128(u128::from(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(
            ids.next_id().to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
        assert_eq!(
            ids.next_id().to_string(),
            "00000000-0000-0000-0000-000000000002"
        );
    }

    #[test]
    fn v7_ids_are_unique() {
        let ids = UuidV7Generator;
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
    }
}
