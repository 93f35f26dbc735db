//! Identifier generation
//!
//! Thread and message ids come from an injected [`IdGenerator`] so tests can
//! use deterministic ids. Every implementation must return a value never
//! returned before by the same generator.

use std::sync::atomic::{AtomicU64, Ordering};

/// Produces fresh, unique, opaque identifiers
pub trait IdGenerator: Send + Sync {
    /// Return an id not previously returned by this generator
    fn generate(&self) -> String;
}

/// Random v4 UUIDs (the default)
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Counter-based ids: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Create a generator whose ids start with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new("t");
        assert_eq!(ids.generate(), "t-1");
        assert_eq!(ids.generate(), "t-2");
    }

    #[test]
    fn test_uuid_ids_unique() {
        let ids = UuidIdGenerator;
        let seen: HashSet<String> = (0..100).map(|_| ids.generate()).collect();
        assert_eq!(seen.len(), 100);
    }
}
