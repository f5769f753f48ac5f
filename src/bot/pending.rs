use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Menus shown by `/get_vpn` that have not been answered yet.
///
/// Only consulted when the bot runs with `require_menu`; otherwise any
/// VPN label is accepted at any time.
#[derive(Debug)]
pub struct PendingChoices {
    menus: DashMap<i64, Instant>,
    ttl: Duration,
}

impl PendingChoices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            menus: DashMap::new(),
            ttl,
        }
    }

    /// Record that `actor_id` was just shown the menu
    pub fn offer(&self, actor_id: i64) {
        self.evict_expired();
        self.menus.insert(actor_id, Instant::now());
    }

    /// Consume the actor's pending menu. `false` if none or expired.
    pub fn take(&self, actor_id: i64) -> bool {
        match self.menus.remove(&actor_id) {
            Some((_, shown_at)) => shown_at.elapsed() <= self.ttl,
            None => false,
        }
    }

    /// Remove expired entries
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.menus.retain(|_, shown_at| shown_at.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_then_take_once() {
        let pending = PendingChoices::new(Duration::from_secs(300));
        pending.offer(42);
        assert!(pending.take(42));
        assert!(!pending.take(42));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_take_without_offer() {
        let pending = PendingChoices::new(Duration::from_secs(300));
        pending.offer(1);
        assert!(!pending.take(2));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_expired_menu_is_rejected() {
        let pending = PendingChoices::new(Duration::from_millis(0));
        pending.offer(42);
        std::thread::sleep(Duration::from_millis(10));
        assert!(!pending.take(42));
    }

    #[test]
    fn test_offer_evicts_stale_entries() {
        let pending = PendingChoices::new(Duration::from_millis(0));
        pending.offer(1);
        std::thread::sleep(Duration::from_millis(10));
        pending.offer(2);
        assert_eq!(pending.len(), 1);
    }
}
