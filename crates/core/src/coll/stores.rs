//! Typed store facades over the collection engine.
//!
//! The engine itself is kind-agnostic; these wrappers expose exactly the
//! surface each kind supports. Weak-keyed stores have no size and cannot be
//! iterated, and set stores keep no values of their own.

use super::{Collection, Entries, Keys, Values};
use crate::err::Error;
use crate::ptn::Pattern;
use crate::val::Passable;

/// A strong-keyed map store
#[derive(Clone)]
pub struct MapStore(pub(crate) Collection);

impl MapStore {
	pub fn label(&self) -> &str {
		self.0.label()
	}

	pub fn vref(&self) -> String {
		self.0.vref()
	}

	pub fn key_schema(&self) -> &Pattern {
		self.0.key_schema()
	}

	pub fn has(&self, key: &Passable) -> bool {
		self.0.has(key)
	}

	pub fn get(&self, key: &Passable) -> Result<Passable, Error> {
		self.0.get(key)
	}

	pub fn init(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.0.init(key, value)
	}

	pub fn set(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.0.set(key, value)
	}

	pub fn delete(&self, key: &Passable) -> Result<(), Error> {
		self.0.delete(key)
	}

	pub fn keys(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Keys, Error> {
		self.0.keys(key_pattern, value_pattern)
	}

	pub fn values(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Values, Error> {
		self.0.values(key_pattern, value_pattern)
	}

	pub fn entries(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Entries, Error> {
		self.0.entries(key_pattern, value_pattern)
	}

	pub fn clear(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<(), Error> {
		self.0.clear(key_pattern, value_pattern)
	}

	pub fn size(&self) -> u64 {
		self.0.size()
	}
}

/// A strong-keyed set store
#[derive(Clone)]
pub struct SetStore(pub(crate) Collection);

impl SetStore {
	pub fn label(&self) -> &str {
		self.0.label()
	}

	pub fn vref(&self) -> String {
		self.0.vref()
	}

	pub fn key_schema(&self) -> &Pattern {
		self.0.key_schema()
	}

	pub fn add(&self, key: &Passable) -> Result<(), Error> {
		// Members carry a well-formed value row so the delete path is shared
		self.0.init(key, &Passable::Null)
	}

	pub fn has(&self, key: &Passable) -> bool {
		self.0.has(key)
	}

	pub fn delete(&self, key: &Passable) -> Result<(), Error> {
		self.0.delete(key)
	}

	pub fn keys(&self, key_pattern: Option<Pattern>) -> Result<Keys, Error> {
		self.0.keys(key_pattern, None)
	}

	pub fn clear(&self, key_pattern: Option<Pattern>) -> Result<(), Error> {
		self.0.clear(key_pattern, None)
	}

	pub fn size(&self) -> u64 {
		self.0.size()
	}
}

/// A weak-keyed map store. Weak keys are recognised rather than pinned, so
/// the store cannot enumerate them and keeps no size.
#[derive(Clone)]
pub struct WeakMapStore(pub(crate) Collection);

impl WeakMapStore {
	pub fn label(&self) -> &str {
		self.0.label()
	}

	pub fn vref(&self) -> String {
		self.0.vref()
	}

	pub fn key_schema(&self) -> &Pattern {
		self.0.key_schema()
	}

	pub fn has(&self, key: &Passable) -> bool {
		self.0.has(key)
	}

	pub fn get(&self, key: &Passable) -> Result<Passable, Error> {
		self.0.get(key)
	}

	pub fn init(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.0.init(key, value)
	}

	pub fn set(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.0.set(key, value)
	}

	pub fn delete(&self, key: &Passable) -> Result<(), Error> {
		self.0.delete(key)
	}
}

/// A weak-keyed set store
#[derive(Clone)]
pub struct WeakSetStore(pub(crate) Collection);

impl WeakSetStore {
	pub fn label(&self) -> &str {
		self.0.label()
	}

	pub fn vref(&self) -> String {
		self.0.vref()
	}

	pub fn key_schema(&self) -> &Pattern {
		self.0.key_schema()
	}

	pub fn add(&self, key: &Passable) -> Result<(), Error> {
		self.0.init(key, &Passable::Null)
	}

	pub fn has(&self, key: &Passable) -> bool {
		self.0.has(key)
	}

	pub fn delete(&self, key: &Passable) -> Result<(), Error> {
		self.0.delete(key)
	}
}

/// A reanimated store of whichever kind its identifier named
#[derive(Clone)]
#[non_exhaustive]
pub enum AnyStore {
	Map(MapStore),
	Set(SetStore),
	WeakMap(WeakMapStore),
	WeakSet(WeakSetStore),
}

impl AnyStore {
	/// The label of the underlying collection
	pub fn label(&self) -> &str {
		self.collection().label()
	}

	/// The external identifier of the underlying collection
	pub fn vref(&self) -> String {
		self.collection().vref()
	}

	pub fn into_map(self) -> Option<MapStore> {
		match self {
			AnyStore::Map(store) => Some(store),
			_ => None,
		}
	}

	pub fn into_set(self) -> Option<SetStore> {
		match self {
			AnyStore::Set(store) => Some(store),
			_ => None,
		}
	}

	pub fn into_weak_map(self) -> Option<WeakMapStore> {
		match self {
			AnyStore::WeakMap(store) => Some(store),
			_ => None,
		}
	}

	pub fn into_weak_set(self) -> Option<WeakSetStore> {
		match self {
			AnyStore::WeakSet(store) => Some(store),
			_ => None,
		}
	}

	fn collection(&self) -> &Collection {
		match self {
			AnyStore::Map(store) => &store.0,
			AnyStore::Set(store) => &store.0,
			AnyStore::WeakMap(store) => &store.0,
			AnyStore::WeakSet(store) => &store.0,
		}
	}
}
