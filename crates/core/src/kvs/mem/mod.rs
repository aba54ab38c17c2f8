use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;

use super::{Key, Val, VatStore};

/// An in-memory ordered vat store
#[derive(Default)]
#[non_exhaustive]
pub struct MemStore {
	db: RefCell<BTreeMap<Key, Val>>,
}

impl MemStore {
	/// Open a new store
	pub fn new() -> MemStore {
		MemStore::default()
	}

	/// The number of rows currently stored
	pub fn len(&self) -> usize {
		self.db.borrow().len()
	}

	/// Whether the store holds no rows at all
	pub fn is_empty(&self) -> bool {
		self.db.borrow().is_empty()
	}

	/// Snapshot the keys currently stored, in order
	pub fn keys(&self) -> Vec<Key> {
		self.db.borrow().keys().cloned().collect()
	}
}

impl VatStore for MemStore {
	/// Fetch a key from the store
	fn get(&self, key: &str) -> Option<Val> {
		self.db.borrow().get(key).cloned()
	}

	/// Insert or update a key in the store
	fn set(&self, key: &str, val: &str) {
		trace!(key, "vatstore set");
		self.db.borrow_mut().insert(key.to_owned(), val.to_owned());
	}

	/// Delete a key from the store
	fn delete(&self, key: &str) {
		trace!(key, "vatstore delete");
		self.db.borrow_mut().remove(key);
	}

	/// Fetch the first key strictly after `prior` within the bound range
	fn get_after(&self, prior: &str, lower: &str, upper: Option<&str>) -> Option<(Key, Val)> {
		// An empty or exhausted range never yields
		if upper.is_some_and(|upper| upper <= lower || prior >= upper) {
			return None;
		}
		// Resume strictly after the prior key, but never below the lower bound
		let start = if prior < lower {
			Bound::Included(lower)
		} else {
			Bound::Excluded(prior)
		};
		let end = match upper {
			Some(upper) => Bound::Excluded(upper),
			None => Bound::Unbounded,
		};
		let db = self.db.borrow();
		let (key, val) = db.range::<str, _>((start, end)).next()?;
		// An open-ended probe is a prefix scan rooted at the lower bound
		if upper.is_none() && !key.starts_with(lower) {
			return None;
		}
		Some((key.clone(), val.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn seeded() -> MemStore {
		let db = MemStore::new();
		for (k, v) in [("a.1", "one"), ("a.2", "two"), ("a.3", "three"), ("b.1", "four")] {
			db.set(k, v);
		}
		db
	}

	#[test]
	fn get_set_delete() {
		let db = seeded();
		assert_eq!(db.get("a.2").as_deref(), Some("two"));
		db.set("a.2", "rewritten");
		assert_eq!(db.get("a.2").as_deref(), Some("rewritten"));
		db.delete("a.2");
		assert_eq!(db.get("a.2"), None);
		assert_eq!(db.len(), 3);
	}

	#[test]
	fn get_after_is_strictly_after() {
		let db = seeded();
		let (k, v) = db.get_after("", "a.", Some("a.~")).unwrap();
		assert_eq!((k.as_str(), v.as_str()), ("a.1", "one"));
		let (k, _) = db.get_after("a.1", "a.", Some("a.~")).unwrap();
		assert_eq!(k, "a.2");
		let (k, _) = db.get_after("a.20", "a.", Some("a.~")).unwrap();
		assert_eq!(k, "a.3");
	}

	#[test]
	fn get_after_honours_the_upper_bound() {
		let db = seeded();
		assert_eq!(db.get_after("a.3", "a.", Some("a.~")), None);
		assert_eq!(db.get_after("a.3", "a.", Some("b.2")).unwrap().0, "b.1");
	}

	#[test]
	fn open_ended_probe_is_a_prefix_scan() {
		let db = seeded();
		let (k, _) = db.get_after("a.2", "a.", None).unwrap();
		assert_eq!(k, "a.3");
		// The next row exists but does not carry the prefix
		assert_eq!(db.get_after("a.3", "a.", None), None);
	}

	#[test]
	fn prior_below_lower_starts_at_lower() {
		let db = seeded();
		let (k, _) = db.get_after("", "a.2", Some("a.~")).unwrap();
		assert_eq!(k, "a.2");
	}
}
