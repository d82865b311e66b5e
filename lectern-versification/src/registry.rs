//! Process-wide registry of reference systems.
//!
//! Systems are immutable once built, so the registry hands out
//! `&'static` references. The KJV system is seeded on first access;
//! anything else must be registered explicitly before lookup.

use crate::canon;
use crate::error::{Result, VersificationError};
use crate::system::Versification;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

static REGISTRY: OnceLock<RwLock<HashMap<String, &'static Versification>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, &'static Versification>> {
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, &'static Versification> = HashMap::new();
        let kjv: &'static Versification = Box::leak(Box::new(canon::kjv::system()));
        map.insert(kjv.name().to_owned(), kjv);
        RwLock::new(map)
    })
}

/// Look up a system by name. Built-in systems are always present.
pub fn get(name: &str) -> Result<&'static Versification> {
    let map = registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    map.get(name)
        .copied()
        .ok_or_else(|| VersificationError::UnknownSystem(name.to_owned()))
}

/// The built-in KJV system.
pub fn kjv() -> &'static Versification {
    match get(canon::kjv::NAME) {
        Ok(v) => v,
        // Seeded in registry(); the lookup cannot miss.
        Err(_) => unreachable!("KJV is always registered"),
    }
}

/// Register a custom system under its own name. The system is leaked to
/// obtain a `'static` borrow; replaces any previous entry of that name.
pub fn register(system: Versification) -> &'static Versification {
    let leaked: &'static Versification = Box::leak(Box::new(system));
    let mut map = registry()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    map.insert(leaked.name().to_owned(), leaked);
    leaked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BibleBook;

    #[test]
    fn test_kjv_always_present() {
        let v = kjv();
        assert_eq!(v.name(), "KJV");
        assert!(get("KJV").is_ok());
        assert_eq!(v.maximum_ordinal(), 32_359);
    }

    #[test]
    fn test_unknown_system() {
        assert!(matches!(
            get("Vulg"),
            Err(VersificationError::UnknownSystem(name)) if name == "Vulg"
        ));
    }

    #[test]
    fn test_register_custom_system() {
        let custom = Versification::new(
            "TinyRegistry",
            &[BibleBook::Gen],
            &[],
            &[&[3]],
            &[],
        );
        let registered = register(custom);
        let fetched = get("TinyRegistry").expect("registered system resolves");
        assert!(std::ptr::eq(registered, fetched));
        assert_eq!(fetched.maximum_ordinal(), 6);
    }
}
