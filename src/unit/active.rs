//! Last detected change.
//!
//! Written by the watcher, read by request handlers that have no explicit
//! unit selector. Assignment is an atomic pointer swap, so concurrent
//! readers always see a whole value (last write wins).

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::UnitName;

#[derive(Debug, Default)]
pub struct ActiveUnit {
    current: ArcSwapOption<UnitName>,
}

impl ActiveUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, unit: UnitName) {
        self.current.store(Some(Arc::new(unit)));
    }

    pub fn get(&self) -> Option<UnitName> {
        self.current.load_full().map(|unit| (*unit).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let active = ActiveUnit::new();
        assert_eq!(active.get(), None);

        active.set(UnitName::new("a"));
        active.set(UnitName::new("b"));
        assert_eq!(active.get(), Some(UnitName::new("b")));
    }

    #[test]
    fn test_concurrent_writers_leave_a_whole_value() {
        let active = Arc::new(ActiveUnit::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let active = Arc::clone(&active);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        active.set(UnitName::new(format!("unit-{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let name = active.get().unwrap();
        assert!(name.as_str().starts_with("unit-"));
    }
}
