//! Service keys identifying abstract factories.

use std::any::TypeId;
use std::fmt;

/// Key for service registration, override and lookup.
///
/// A key names the abstract factory a caller asks for. Default factories
/// and application-lifetime overrides are both stored under the same key,
/// so installing an override for `key_of_type::<DataService>()` redirects
/// every resolution of `DataService`.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifespan::{Key, key_of_type};
/// use std::any::TypeId;
///
/// let key = key_of_type::<u32>();
/// assert_eq!(key, Key::Type(TypeId::of::<u32>(), "u32"));
/// assert_eq!(key.display_name(), "u32");
/// assert_eq!(key.service_name(), None);
///
/// let named = Key::TypeNamed(TypeId::of::<u32>(), "u32", "port");
/// assert_ne!(key, named);
/// assert_eq!(named.service_name(), Some("port"));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Named concrete type key with TypeId, typename, and name
    ///
    /// Used when several registrations of the same type must coexist.
    TypeNamed(TypeId, &'static str, &'static str),
}

impl Key {
    /// Get the type name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::TypeNamed(_, name, _) => name,
        }
    }

    /// Get the registration name for named services, or None for unnamed services
    pub fn service_name(&self) -> Option<&'static str> {
        match self {
            Key::Type(_, _) => None,
            Key::TypeNamed(_, _, name) => Some(name),
        }
    }

    fn type_id(&self) -> TypeId {
        match self {
            Key::Type(id, _) | Key::TypeNamed(id, _, _) => *id,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => f.write_str(name),
            Key::TypeNamed(_, name, service) => write!(f, "{}[{}]", name, service),
        }
    }
}

// The type name is diagnostic only; identity is the TypeId (plus the registration name).
impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::TypeNamed(a, _, name_a), Key::TypeNamed(b, _, name_b)) => {
                a == b && name_a == name_b
            }
            _ => false,
        }
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a.cmp(b),
            (Key::TypeNamed(a, _, name_a), Key::TypeNamed(b, _, name_b)) => {
                a.cmp(b).then_with(|| name_a.cmp(name_b))
            }
            (Key::Type(_, _), Key::TypeNamed(_, _, _)) => Ordering::Less,
            (Key::TypeNamed(_, _, _), Key::Type(_, _)) => Ordering::Greater,
        }
    }
}

impl std::hash::Hash for Key {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::TypeNamed(id, _, name) => {
                1u8.hash(state);
                id.hash(state);
                name.hash(state);
            }
        }
    }
}

/// Key of the unnamed registration for `T`.
#[inline]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key of the registration for `T` under `name`.
#[inline]
pub fn key_of_named<T: 'static>(name: &'static str) -> Key {
    Key::TypeNamed(TypeId::of::<T>(), std::any::type_name::<T>(), name)
}

impl Key {
    /// Whether this key refers to values of type `T`, regardless of name.
    pub fn is_for<T: 'static>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_identity_ignores_display_name() {
        let a = Key::Type(TypeId::of::<String>(), "String");
        let b = Key::Type(TypeId::of::<String>(), "alloc::string::String");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_named_keys_are_distinct() {
        let plain = key_of_type::<u32>();
        let first = key_of_named::<u32>("first");
        let second = key_of_named::<u32>("second");

        assert_ne!(plain, first);
        assert_ne!(first, second);
        assert!(first.is_for::<u32>());
        assert!(!first.is_for::<u64>());
    }

    #[test]
    fn test_ordering_puts_unnamed_first() {
        let mut keys = BTreeSet::new();
        keys.insert(key_of_named::<u8>("z"));
        keys.insert(key_of_type::<u8>());

        let first = keys.iter().next().unwrap();
        assert_eq!(first.service_name(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(key_of_type::<u8>().to_string(), "u8");
        assert_eq!(key_of_named::<u8>("port").to_string(), "u8[port]");
    }
}
