use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Issues `chat_id` sort keys from the millisecond clock.
///
/// Ids are strictly increasing for the lifetime of the generator: two appends in
/// the same millisecond, or a clock that steps backwards, get `last + 1`.
#[derive(Debug, Default)]
pub struct ChatIdGenerator {
    last: AtomicI64,
}

impl ChatIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        self.next_after(Utc::now().timestamp_millis())
    }

    fn next_after(&self, now_ms: i64) -> i64 {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_ms.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_follows_clock_when_it_advances() {
        let ids = ChatIdGenerator::new();
        assert_eq!(ids.next_after(1_000), 1_000);
        assert_eq!(ids.next_after(1_005), 1_005);
    }

    #[test]
    fn test_same_millisecond_is_bumped() {
        let ids = ChatIdGenerator::new();
        assert_eq!(ids.next_after(1_000), 1_000);
        assert_eq!(ids.next_after(1_000), 1_001);
        assert_eq!(ids.next_after(1_000), 1_002);
    }

    #[test]
    fn test_clock_going_backwards_keeps_order() {
        let ids = ChatIdGenerator::new();
        assert_eq!(ids.next_after(2_000), 2_000);
        assert_eq!(ids.next_after(1_500), 2_001);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let ids = Arc::new(ChatIdGenerator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..500).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate chat id {}", id);
            }
        }
        assert_eq!(seen.len(), 8 * 500);
    }
}
