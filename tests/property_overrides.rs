//! Property-based tests for the override table
//!
//! Any interleaving of inserts and removals must leave the table agreeing
//! with a plain map that keeps the first value written per key, and
//! resolution must always prefer an installed override over the default.

use ferrous_lifespan::{key_of_named, AnyArc, Key, Resolver, ServiceCollection};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Slot(u32);

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, u32),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        (0..NAMES.len()).prop_map(Op::Remove),
    ]
}

fn key(i: usize) -> Key {
    key_of_named::<Slot>(NAMES[i])
}

proptest! {
    #[test]
    fn override_table_matches_set_default_model(ops in prop::collection::vec(op(), 0..64)) {
        let mut sc = ServiceCollection::new();
        for name in NAMES {
            sc.add_named_scoped_factory::<Slot, _>(name, |_| Slot(u32::MAX));
        }
        let sp = sc.build();
        let mut model: HashMap<usize, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let shared: AnyArc = Arc::new(Slot(v));
                    let inserted = sp.overrides().insert(key(k), move |_| Ok(shared.clone()));
                    let expected = !model.contains_key(&k);
                    model.entry(k).or_insert(v);
                    prop_assert_eq!(inserted, expected);
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sp.overrides().remove(&key(k)), model.remove(&k).is_some());
                }
            }

            prop_assert_eq!(sp.overrides().len(), model.len());
            let scope = sp.create_scope();
            for i in 0..NAMES.len() {
                let resolved = scope.get_named::<Slot>(NAMES[i]).unwrap();
                let expected = model.get(&i).copied().unwrap_or(u32::MAX);
                prop_assert_eq!(resolved.0, expected);
                prop_assert_eq!(sp.overrides().contains(&key(i)), model.contains_key(&i));
            }
        }
    }

    #[test]
    fn removing_every_key_empties_table(values in prop::collection::vec(any::<u32>(), 1..16)) {
        let sp = ServiceCollection::new().build();
        for (i, v) in values.iter().enumerate() {
            sp.overrides().insert_instance(Arc::new(Slot(*v)));
            let shared: AnyArc = Arc::new(Slot(*v));
            sp.overrides().insert(key(i % NAMES.len()), move |_| Ok(shared.clone()));
        }

        for i in 0..NAMES.len() {
            sp.overrides().remove(&key(i));
            sp.overrides().remove(&key(i));
        }
        sp.overrides().remove(&ferrous_lifespan::key_of_type::<Slot>());

        prop_assert!(sp.overrides().is_empty());
        prop_assert!(sp.get::<Slot>().is_err());
    }
}
