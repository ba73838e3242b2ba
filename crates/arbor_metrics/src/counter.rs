//! Named counters for lifecycle events

use std::collections::HashMap;

/// Monotonic event counters keyed by a static name such as
/// `"transitions.attach"` or `"units.captured"`.
#[derive(Debug, Default)]
pub struct Counter {
    counters: HashMap<&'static str, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: usize) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("units.captured", 1);
        counter.increment("units.captured", 4);
        counter.increment("transitions.detach", 1);

        assert_eq!(counter.get("units.captured"), 5);
        assert_eq!(counter.get("transitions.detach"), 1);
        assert_eq!(counter.get("missing"), 0);
    }
}
