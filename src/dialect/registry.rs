//! Explicit, non-singleton dialect registry: process-wide state with
//! explicit `init()` at startup, no lazy singleton that captures partial
//! state. Tests instantiate a fresh registry.

use std::collections::HashMap;

use super::{Dialect, DialectTag};

pub struct DialectRegistry {
    dialects: HashMap<DialectTag, Dialect>,
}

impl DialectRegistry {
    /// Build a fresh registry populated with the six built-in dialects.
    pub fn init() -> Self {
        let mut dialects = HashMap::new();
        for tag in DialectTag::ALL {
            dialects.insert(tag, Dialect::for_tag(tag));
        }
        Self { dialects }
    }

    pub fn get(&self, tag: DialectTag) -> Dialect {
        *self
            .dialects
            .get(&tag)
            .unwrap_or_else(|| panic!("dialect {tag} missing from registry"))
    }

    /// Override or add a dialect (e.g. swapping in `Dialect::oracle_legacy()`).
    pub fn register(&mut self, tag: DialectTag, dialect: Dialect) {
        self.dialects.insert(tag, dialect);
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_populates_all_six_dialects() {
        let registry = DialectRegistry::init();
        for tag in DialectTag::ALL {
            let dialect = registry.get(tag);
            assert_eq!(dialect.tag, tag);
        }
    }

    #[test]
    fn register_overrides_oracle_with_legacy_pagination() {
        let mut registry = DialectRegistry::init();
        registry.register(DialectTag::Oracle, Dialect::oracle_legacy());
        let dialect = registry.get(DialectTag::Oracle);
        assert!(matches!(dialect.pagination, super::super::PaginationStyle::RownumBetween));
    }

    #[test]
    fn fresh_registries_are_independent() {
        let mut a = DialectRegistry::init();
        let b = DialectRegistry::init();
        a.register(DialectTag::Mysql, Dialect::ansi());
        assert_eq!(a.get(DialectTag::Mysql).tag, DialectTag::Ansi);
        assert_eq!(b.get(DialectTag::Mysql).tag, DialectTag::Mysql);
    }
}
