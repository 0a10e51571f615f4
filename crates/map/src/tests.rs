use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::test_fixtures::{
	FlakyStore, User, UserKey, assert_consistent, id, name, user, user_index, users,
};
use crate::{
	ConcurrentStore, DashStore, Index, IndexError, IndexedMap, IndexedMapConfig, IndexedMapError, StoreError,
	StripingConfig,
};

fn map_with(striping: StripingConfig) -> IndexedMap<UserKey, User> {
	let config = IndexedMapConfig {
		striping,
		initial_capacity: Some(16),
	};
	IndexedMap::from_config(user_index, &config).unwrap()
}

/// Secondary-key update: dropped keys stop resolving, kept and new keys follow the new value.
#[test]
fn test_secondary_update_end_to_end() {
	let map = users();
	let original = user(1, "a@x", "loginA");
	assert_eq!(map.put_value(original.clone()).unwrap(), None);
	assert_eq!(map.get(&name("a@x")), Some(original.clone()));

	let updated = user(1, "a@y", "loginA");
	assert!(map.replace_value_if(&original, updated.clone()).unwrap());

	assert_eq!(map.get(&name("a@x")), None);
	assert_eq!(map.get(&name("a@y")), Some(updated.clone()));
	assert_eq!(map.get(&name("loginA")), Some(updated.clone()));
	assert_eq!(map.get(&id(1)), Some(updated));
	assert_consistent(&map);
}

#[rstest]
#[case::fixed(StripingConfig::Fixed { stripes: 8 })]
#[case::dynamic(StripingConfig::Dynamic)]
fn test_size_counts_values_not_keys(#[case] striping: StripingConfig) {
	let map = map_with(striping);
	map.put_all_values([user(1, "a@x", "a"), user(2, "b@x", "b")])
		.unwrap();
	map.put_value(user(3, "c@x", "c")).unwrap();

	assert_eq!(map.len(), 3);
	assert_eq!(map.values().len(), 3);
	assert_eq!(map.keys().len(), 9);
	assert_eq!(map.entries().len(), 9);
	assert_eq!(map.entries().iter().count(), 9);
	assert_consistent(&map);
}

#[rstest]
#[case::by_id(id(7))]
#[case::by_email(name("g@x"))]
#[case::by_login(name("g"))]
fn test_round_trip_through_every_key(#[case] key: UserKey) {
	let map = users();
	let value = user(7, "g@x", "g");
	map.put(&key, value.clone()).unwrap();
	assert_eq!(map.get(&key), Some(value.clone()));
	assert!(map.contains_key(&key));
	assert!(map.contains_value(&value));
}

#[test]
fn test_remove_is_idempotent() {
	let map = users();
	assert_eq!(map.remove(&name("nobody")).unwrap(), None);
	assert!(map.is_empty());

	let value = user(1, "a@x", "a");
	map.put_value(value.clone()).unwrap();
	assert_eq!(map.remove(&name("a")).unwrap(), Some(value.clone()));
	assert_eq!(map.remove(&name("a")).unwrap(), None);
	assert!(!map.remove_value(&value).unwrap());
	assert!(!map.remove_if(&id(1), &value).unwrap());
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
}

#[test]
fn test_put_overwrite_runs_delta() {
	let map = users();
	map.put_value(user(1, "a@x", "a")).unwrap();
	let prev = map.put(&id(1), user(1, "a@x", "renamed")).unwrap();
	assert_eq!(prev, Some(user(1, "a@x", "a")));
	assert_eq!(map.get(&name("a")), None);
	assert_eq!(map.get(&name("renamed")).map(|u| u.login), Some("renamed".to_string()));
	assert_eq!(map.len(), 1);
	assert_consistent(&map);
}

#[test]
fn test_cas_rejects_primary_change_before_mutation() {
	let map = users();
	let original = user(1, "a@x", "a");
	map.put_value(original.clone()).unwrap();

	let err = map
		.replace_value_if(&original, user(2, "a@x", "a"))
		.unwrap_err();
	assert!(matches!(err, IndexedMapError::PrimaryMismatch { .. }));
	assert_eq!(map.get(&id(1)), Some(original.clone()));
	assert_eq!(map.get(&id(2)), None);
	assert!(!map.striping().is_locked(&id(1)));
	assert_consistent(&map);
}

#[rstest]
#[case::current(0, true)]
#[case::stale(9, false)]
fn test_cas_succeeds_only_on_current_value(#[case] expected_rev: u32, #[case] swapped: bool) {
	let map = users();
	let current = user(1, "a@x", "a");
	map.put_value(current.clone()).unwrap();

	let expected = User {
		rev: expected_rev,
		..current.clone()
	};
	let next = User {
		rev: 1,
		email: "a@z".into(),
		..current.clone()
	};
	assert_eq!(map.replace_value_if(&expected, next.clone()).unwrap(), swapped);

	let stored = if swapped { next } else { current };
	assert_eq!(map.get(&id(1)), Some(stored));
	assert_consistent(&map);
}

#[test]
fn test_key_qualified_put_rejects_foreign_key() {
	let map = users();
	let err = map.put(&name("someone-else"), user(1, "a@x", "a")).unwrap_err();
	assert!(matches!(err, IndexedMapError::KeyNotInIndex { .. }));
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
}

#[rstest]
#[case::old_key(name("a@x"), Ok(true))]
#[case::new_key(name("a@y"), Ok(true))]
#[case::shared_key(id(1), Ok(true))]
#[case::foreign_key(name("zzz"), Err(()))]
fn test_key_qualified_cas_accepts_either_key_set(
	#[case] key: UserKey,
	#[case] expected: Result<bool, ()>,
) {
	let map = users();
	let old = user(1, "a@x", "a");
	map.put_value(old.clone()).unwrap();
	let res = map.replace_if(&key, &old, user(1, "a@y", "a"));
	match expected {
		Ok(swapped) => assert_eq!(res.unwrap(), swapped),
		Err(()) => assert!(matches!(res, Err(IndexedMapError::KeyNotInIndex { .. }))),
	}
	assert_consistent(&map);
}

#[test]
fn test_put_if_absent_keeps_existing_index() {
	let map = users();
	let first = user(1, "a@x", "a");
	assert_eq!(map.put_if_absent_value(first.clone()).unwrap(), None);

	let second = user(1, "other@x", "other");
	assert_eq!(map.put_if_absent(&id(1), second).unwrap(), Some(first.clone()));
	assert_eq!(map.get(&name("other")), None);
	assert_eq!(map.get(&name("a")), Some(first));
	assert_eq!(map.keys().len(), 3);
}

#[test]
fn test_replace_is_noop_when_absent() {
	let map = users();
	assert_eq!(map.replace_value(user(1, "a@x", "a")).unwrap(), None);
	assert!(map.is_empty());
	assert!(map.keys().is_empty());

	map.put_value(user(1, "a@x", "a")).unwrap();
	let prev = map.replace(&name("b"), user(1, "a@x", "b")).unwrap();
	assert_eq!(prev, Some(user(1, "a@x", "a")));
	assert_eq!(map.get(&name("b")).map(|u| u.login), Some("b".to_string()));
	assert_eq!(map.get(&name("a")), None);
	assert_consistent(&map);
}

#[test]
fn test_conditional_removal() {
	let map = users();
	let value = user(1, "a@x", "a");
	map.put_value(value.clone()).unwrap();

	let stale = User {
		rev: 3,
		..value.clone()
	};
	assert!(!map.remove_if(&name("a@x"), &stale).unwrap());
	assert!(!map.remove_value(&stale).unwrap());
	assert_eq!(map.len(), 1);

	assert!(map.remove_if(&name("a@x"), &value).unwrap());
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
}

#[test]
fn test_invalid_index_rejected_without_state_change() {
	let map = users();
	let err = map.put_value(user(1, "same", "same")).unwrap_err();
	assert_eq!(
		err,
		IndexedMapError::Index(IndexError::DuplicateSecondary {
			key: format!("{:?}", name("same")),
		})
	);
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
}

#[test]
fn test_clear_removes_everything() {
	let map = users();
	for i in 0..10 {
		map.put_value(user(i, &format!("{i}@x"), &format!("u{i}")))
			.unwrap();
	}
	map.clear().unwrap();
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
}

#[test]
fn test_views_redirect_removal() {
	let map = users();
	for i in 0..6 {
		map.put_value(user(i, &format!("{i}@x"), &format!("u{i}")))
			.unwrap();
	}

	// Removing one key removes the whole value.
	assert!(map.keys().remove(&name("0@x")).unwrap());
	assert_eq!(map.get(&id(0)), None);
	assert_eq!(map.keys().len(), 15);

	// Rejecting one key of each odd value removes those values entirely.
	let removed = map
		.keys()
		.retain(|k| !matches!(k, UserKey::Id(n) if n % 2 == 1))
		.unwrap();
	assert_eq!(removed, 3);
	assert_eq!(map.len(), 2);

	let survivor = user(2, "2@x", "u2");
	assert!(map.values().contains(&survivor));
	assert!(map.values().remove(&survivor).unwrap());
	assert!(!map.entries().contains(&id(2), &survivor));

	let last = user(4, "4@x", "u4");
	assert!(map.entries().contains(&name("u4"), &last));
	assert_eq!(map.entries().retain(|_, v| v.id != 4).unwrap(), 1);
	assert!(map.is_empty());
	assert!(map.keys().is_empty());
	assert_consistent(&map);
}

#[test]
fn test_values_view_retain_and_clear() {
	let map = users();
	for i in 0..4 {
		map.put_value(user(i, &format!("{i}@x"), &format!("u{i}")))
			.unwrap();
	}
	assert_eq!(map.values().retain(|u| u.id < 2).unwrap(), 2);
	assert_eq!(map.len(), 2);
	assert_consistent(&map);
	map.entries().clear().unwrap();
	assert!(map.values().is_empty());
	assert!(map.entries().is_empty());
}

#[test]
fn test_store_failure_releases_lock() {
	let index_store = FlakyStore::<UserKey, Arc<Index<UserKey>>>::new();
	let map = IndexedMap::builder(user_index)
		.index_store(Arc::clone(&index_store))
		.build();

	index_store.set_failing(true);
	let err = map.put_value(user(1, "a@x", "a")).unwrap_err();
	assert_eq!(
		err,
		IndexedMapError::Store(StoreError::Unavailable {
			reason: "injected".into()
		})
	);
	assert!(!map.striping().is_locked(&id(1)));

	// No rollback: the primary write landed, its keys did not.
	assert_eq!(map.len(), 1);
	assert_eq!(map.get(&name("a@x")), None);

	index_store.set_failing(false);
	map.put_value(user(1, "a@x", "a")).unwrap();
	assert_consistent(&map);
}

#[test]
fn test_out_of_band_eviction_is_tolerated() {
	let primary = Arc::new(DashStore::<UserKey, User>::new());
	let map = IndexedMap::builder(user_index)
		.primary_store(Arc::clone(&primary))
		.build();
	map.put_value(user(1, "a@x", "a")).unwrap();
	map.put_value(user(2, "b@x", "b")).unwrap();

	// An eviction policy drops entries behind the map's back.
	primary.remove(&id(1)).unwrap();
	primary.remove(&id(2)).unwrap();
	assert_eq!(map.get(&name("a@x")), None);
	assert_eq!(map.keys().len(), 6);

	// Reported eviction sweeps its keys.
	assert!(map.evicted(&id(1)).unwrap());
	assert!(!map.evicted(&id(1)).unwrap());
	assert_eq!(map.keys().len(), 3);

	// Unreported eviction: removal through any key degrades to a no-op that cleans up.
	assert_eq!(map.remove(&name("b")).unwrap(), None);
	assert!(map.keys().is_empty());
	assert_consistent(&map);
}

#[test]
fn test_reinsert_after_unreported_eviction_drops_stale_keys() {
	let primary = Arc::new(DashStore::<UserKey, User>::new());
	let map = IndexedMap::builder(user_index)
		.primary_store(Arc::clone(&primary))
		.build();
	map.put_value(user(1, "a@x", "a")).unwrap();
	primary.remove(&id(1)).unwrap();

	map.put_value(user(1, "new@x", "a")).unwrap();
	assert_eq!(map.index_of(&name("a@x")), None);
	assert_consistent(&map);
}

#[test]
fn test_reinsert_after_unreported_eviction_keeps_key_taken_by_other_value() {
	let primary = Arc::new(DashStore::<UserKey, User>::new());
	let map = IndexedMap::builder(user_index)
		.primary_store(Arc::clone(&primary))
		.build();
	map.put_value(user(1, "x@x", "la")).unwrap();
	primary.remove(&id(1)).unwrap();

	// A second value claims the evicted value's email before the evicted primary returns.
	let other = user(2, "x@x", "lb");
	map.put_value(other.clone()).unwrap();
	let returning = user(1, "y@x", "la");
	map.put_value(returning.clone()).unwrap();

	assert_eq!(map.get(&name("x@x")), Some(other.clone()));
	assert_eq!(map.get(&name("lb")), Some(other));
	assert_eq!(map.get(&name("y@x")), Some(returning.clone()));
	assert_eq!(map.get(&name("la")), Some(returning));
	assert_eq!(map.keys().len(), 6);
	assert_consistent(&map);
}

#[derive(Debug, Clone)]
enum Op {
	Put(u32, u32),
	PutIfAbsent(u32, u32),
	Replace(u32, u32),
	ReplaceIf(u32, u32, u32),
	RemoveById(u32),
	RemoveByEmail(u32, u32),
	RemoveValue(u32, u32),
}

fn versioned(id: u32, variant: u32) -> User {
	user(id, &format!("e{id}-{variant}"), &format!("l{id}-{variant}"))
}

fn arb_op() -> impl Strategy<Value = Op> {
	let id = 0u32..4;
	let v = 0u32..3;
	prop_oneof![
		(id.clone(), v.clone()).prop_map(|(i, v)| Op::Put(i, v)),
		(id.clone(), v.clone()).prop_map(|(i, v)| Op::PutIfAbsent(i, v)),
		(id.clone(), v.clone()).prop_map(|(i, v)| Op::Replace(i, v)),
		(id.clone(), v.clone(), v.clone()).prop_map(|(i, a, b)| Op::ReplaceIf(i, a, b)),
		id.clone().prop_map(Op::RemoveById),
		(id.clone(), v.clone()).prop_map(|(i, v)| Op::RemoveByEmail(i, v)),
		(id, v).prop_map(|(i, v)| Op::RemoveValue(i, v)),
	]
}

proptest! {
	/// The map agrees with a plain `HashMap<id, variant>` model after every operation.
	#[test]
	fn prop_model_consistency(ops in prop::collection::vec(arb_op(), 1..60)) {
		let map = users();
		let mut model: HashMap<u32, u32> = HashMap::new();

		for op in ops {
			match op {
				Op::Put(i, v) => {
					map.put_value(versioned(i, v)).unwrap();
					model.insert(i, v);
				}
				Op::PutIfAbsent(i, v) => {
					map.put_if_absent_value(versioned(i, v)).unwrap();
					model.entry(i).or_insert(v);
				}
				Op::Replace(i, v) => {
					map.replace_value(versioned(i, v)).unwrap();
					if let Some(slot) = model.get_mut(&i) {
						*slot = v;
					}
				}
				Op::ReplaceIf(i, a, b) => {
					let swapped = map.replace_value_if(&versioned(i, a), versioned(i, b)).unwrap();
					prop_assert_eq!(swapped, model.get(&i) == Some(&a));
					if swapped {
						model.insert(i, b);
					}
				}
				Op::RemoveById(i) => {
					let removed = map.remove(&id(i)).unwrap();
					prop_assert_eq!(removed.map(|u| u.email), model.remove(&i).map(|v| format!("e{i}-{v}")));
				}
				Op::RemoveByEmail(i, v) => {
					let removed = map.remove(&name(&format!("e{i}-{v}"))).unwrap();
					let expected = model.get(&i) == Some(&v);
					prop_assert_eq!(removed.is_some(), expected);
					if expected {
						model.remove(&i);
					}
				}
				Op::RemoveValue(i, v) => {
					let removed = map.remove_value(&versioned(i, v)).unwrap();
					let expected = model.get(&i) == Some(&v);
					prop_assert_eq!(removed, expected);
					if expected {
						model.remove(&i);
					}
				}
			}

			prop_assert_eq!(map.len(), model.len());
			prop_assert_eq!(map.keys().len(), model.len() * 3);
			for i in 0..4 {
				prop_assert_eq!(map.get(&id(i)), model.get(&i).map(|&v| versioned(i, v)));
				for v in 0..3 {
					let live = model.get(&i) == Some(&v);
					prop_assert_eq!(map.contains_key(&name(&format!("e{i}-{v}"))), live);
					prop_assert_eq!(map.contains_key(&name(&format!("l{i}-{v}"))), live);
				}
			}
		}
	}
}
