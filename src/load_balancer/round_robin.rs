//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{Instance, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn choose(&self, candidates: &[Instance]) -> Option<Instance> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let i1 = Instance::new("svc", "127.0.0.1:8080".parse().unwrap());
        let i2 = Instance::new("svc", "127.0.0.1:8081".parse().unwrap());
        let candidates = vec![i1.clone(), i2.clone()];

        assert_eq!(lb.choose(&candidates), Some(i1.clone()));
        assert_eq!(lb.choose(&candidates), Some(i2));
        assert_eq!(lb.choose(&candidates), Some(i1));
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(RoundRobin::new().choose(&[]), None);
    }
}
