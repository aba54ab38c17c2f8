//! The collection engine.
//!
//! A [`Collection`] is the live handle over one persistent container: it
//! enforces the key schema, encodes keys through the rank codec, assigns
//! ordinals to remotable keys, keeps the reference manager's counts in step
//! with every mutation, and answers pattern queries with bounded range scans.

mod iter;
mod stores;

pub use self::iter::{Entries, Keys, Values};
pub use self::stores::{AnyStore, MapStore, SetStore, WeakMapStore, WeakSetStore};

use std::cell::Cell;
use std::rc::Rc;

use tracing::instrument;

use crate::err::Error;
use crate::key::{self, codec};
use crate::kvs::VatStore;
use crate::marshal::{CapData, Marshaller};
use crate::ptn::Pattern;
use crate::val::Passable;
use crate::vrm::{Deleter, ReferenceManager};

/// A live handle over one persistent collection. Clones share the handle's
/// in-memory state; distinct reanimations of the same collection share only
/// the persistent rows.
#[derive(Clone)]
pub struct Collection {
	inner: Rc<Inner>,
}

struct Inner {
	store: Rc<dyn VatStore>,
	vrm: Rc<dyn ReferenceManager>,
	marshaller: Rc<dyn Marshaller>,
	label: String,
	collection_id: u64,
	kind_id: u64,
	key_schema: Pattern,
	/// Row prefix owned by this collection
	prefix: String,
	/// Bumped on every mutation that can affect iteration
	generation: Cell<u64>,
	/// Live entry count. `None` until first read after reanimation.
	size: Cell<Option<u64>>,
	/// Weak collections register this with the reference manager for each
	/// remotable key; it drops the dangling rows when the key is reclaimed
	entry_deleter: Option<Deleter>,
}

/// Build the deleter a weak collection registers for each remotable key. By
/// the time it runs the key object is already gone, so it works on raw rows,
/// and it holds no strong path back to the reference manager.
pub(crate) fn make_entry_deleter(
	store: &Rc<dyn VatStore>,
	vrm: &Rc<dyn ReferenceManager>,
	collection_id: u64,
) -> Deleter {
	let store = store.clone();
	let vrm = Rc::downgrade(vrm);
	Rc::new(move |slot: &str| {
		let ordinal_row = key::ordinal(collection_id, slot);
		let Some(ordinal) = store.get(&ordinal_row) else {
			return;
		};
		let Ok(ordinal) = ordinal.parse::<u64>() else {
			return;
		};
		let entry_row = key::entry(collection_id, &codec::encode_remotable_key(ordinal, slot));
		if let Some(raw) = store.get(&entry_row) {
			if let (Some(vrm), Ok(data)) = (vrm.upgrade(), serde_json::from_str::<CapData>(&raw))
			{
				for slot in &data.slots {
					vrm.remove_reachable_vref(slot);
				}
			}
		}
		store.delete(&entry_row);
		store.delete(&ordinal_row);
	})
}

impl Collection {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn open(
		store: Rc<dyn VatStore>,
		vrm: Rc<dyn ReferenceManager>,
		marshaller: Rc<dyn Marshaller>,
		label: String,
		collection_id: u64,
		kind_id: u64,
		entry_deleter: Option<Deleter>,
		key_schema: Pattern,
		fresh: bool,
	) -> Collection {
		Collection {
			inner: Rc::new(Inner {
				store,
				vrm,
				marshaller,
				label,
				collection_id,
				kind_id,
				key_schema,
				prefix: key::prefix(collection_id),
				generation: Cell::new(0),
				size: Cell::new(fresh.then_some(0)),
				entry_deleter,
			}),
		}
	}

	/// The human label this collection was created with
	pub fn label(&self) -> &str {
		&self.inner.label
	}

	/// The external identifier of this collection
	pub fn vref(&self) -> String {
		key::vref(self.inner.kind_id, self.inner.collection_id)
	}

	/// The key schema every keyed operation is checked against
	pub fn key_schema(&self) -> &Pattern {
		&self.inner.key_schema
	}

	pub(crate) fn generation(&self) -> u64 {
		self.inner.generation.get()
	}

	pub(crate) fn prefix(&self) -> &str {
		&self.inner.prefix
	}

	pub(crate) fn store(&self) -> &dyn VatStore {
		&*self.inner.store
	}

	/// Whether the collection holds an entry for this key. A key outside the
	/// schema is simply absent.
	pub fn has(&self, key: &Passable) -> bool {
		if !self.inner.key_schema.matches(key) {
			return false;
		}
		match key {
			// Remotable presence is the presence of its ordinal mapping
			Passable::Remotable(slot) => matches!(self.ordinal_of(slot), Ok(Some(_))),
			_ => match self.encode_present(key) {
				Ok(Some(encoded)) => {
					self.inner.store.get(&key::entry(self.inner.collection_id, &encoded)).is_some()
				}
				_ => false,
			},
		}
	}

	/// Fetch the value stored under a key
	pub fn get(&self, key: &Passable) -> Result<Passable, Error> {
		self.check_schema(key)?;
		let encoded = self.encode_present(key)?.ok_or(Error::NotFound)?;
		let data = self.read_row(&encoded)?.ok_or(Error::NotFound)?;
		self.inner.marshaller.unserialize(&data)
	}

	/// Store a value under a key which must not already be present
	#[instrument(level = "trace", skip(self, value), fields(label = %self.inner.label))]
	pub fn init(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.check_schema(key)?;
		if self.has(key) {
			return Err(Error::AlreadyPresent);
		}
		// Serialize before touching any persistent state
		let data = self.inner.marshaller.serialize(value)?;
		let encoded = self.encode_fresh(key)?;
		if let Some(slot) = key.slot() {
			match &self.inner.entry_deleter {
				// A weak key is recognised, not pinned
				Some(deleter) => self.inner.vrm.add_recognizable_value(slot, deleter),
				None => self.inner.vrm.add_reachable_vref(slot),
			}
		}
		// Everything the value mentions is pinned either way
		for slot in &data.slots {
			self.inner.vrm.add_reachable_vref(slot);
		}
		self.write_row(&encoded, &data)?;
		self.bump_size(1);
		self.bump_generation();
		Ok(())
	}

	/// Replace the value under a key which must already be present. Value
	/// rewrites do not invalidate open iterators.
	#[instrument(level = "trace", skip(self, value), fields(label = %self.inner.label))]
	pub fn set(&self, key: &Passable, value: &Passable) -> Result<(), Error> {
		self.check_schema(key)?;
		let encoded = self.encode_present(key)?.ok_or(Error::NotFound)?;
		let before = self.read_row(&encoded)?.ok_or(Error::NotFound)?;
		let after = self.inner.marshaller.serialize(value)?;
		self.inner.vrm.update_reference_counts(&before.slots, &after.slots);
		self.write_row(&encoded, &after)
	}

	/// Remove a key and its value
	#[instrument(level = "trace", skip(self), fields(label = %self.inner.label))]
	pub fn delete(&self, key: &Passable) -> Result<(), Error> {
		self.delete_entry(key)?;
		self.bump_generation();
		Ok(())
	}

	/// Lazily iterate the keys matching a pattern, in encoded-key order
	pub fn keys(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Keys, Error> {
		iter::keys(self, key_pattern, value_pattern)
	}

	/// Lazily iterate the values whose keys match a pattern
	pub fn values(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Values, Error> {
		iter::values(self, key_pattern, value_pattern)
	}

	/// Lazily iterate matching entries as key/value pairs
	pub fn entries(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<Entries, Error> {
		iter::entries(self, key_pattern, value_pattern)
	}

	/// Delete every entry matching the patterns
	#[instrument(level = "trace", skip(self), fields(label = %self.inner.label))]
	pub fn clear(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<(), Error> {
		self.clear_matching(key_pattern, value_pattern)?;
		self.bump_generation();
		Ok(())
	}

	/// The number of live entries. The first read on a reanimated handle
	/// pays for one counting scan; mutation maintains it afterwards.
	pub fn size(&self) -> u64 {
		if let Some(size) = self.inner.size.get() {
			return size;
		}
		let size = self.count_entries();
		self.inner.size.set(Some(size));
		size
	}

	fn check_schema(&self, key: &Passable) -> Result<(), Error> {
		if self.inner.key_schema.matches(key) {
			Ok(())
		} else {
			Err(Error::SchemaViolation)
		}
	}

	/// Read the ordinal assigned to a slot within this collection
	fn ordinal_of(&self, slot: &str) -> Result<Option<u64>, Error> {
		let row = key::ordinal(self.inner.collection_id, slot);
		match self.inner.store.get(&row) {
			None => Ok(None),
			Some(text) => {
				text.parse().map(Some).map_err(|_| Error::MetadataCorruption(row))
			}
		}
	}

	/// Assign the next ordinal to a slot, persisting both the assignment and
	/// the advanced allocator state
	fn allocate_ordinal(&self, slot: &str) -> Result<u64, Error> {
		if let Some(ordinal) = self.ordinal_of(slot)? {
			return Ok(ordinal);
		}
		let row = key::next_ordinal(self.inner.collection_id);
		let next = self
			.inner
			.store
			.get(&row)
			.ok_or_else(|| Error::MetadataCorruption(row.clone()))?;
		let ordinal: u64 =
			next.parse().map_err(|_| Error::MetadataCorruption(row.clone()))?;
		if ordinal >= codec::ORDINAL_SPACE {
			return Err(Error::OrdinalOverflow);
		}
		self.inner
			.store
			.set(&key::ordinal(self.inner.collection_id, slot), &ordinal.to_string());
		self.inner.store.set(&row, &(ordinal + 1).to_string());
		trace!(slot, ordinal, label = %self.inner.label, "assigned ordinal");
		Ok(ordinal)
	}

	/// Encode a key, failing with `OrdinalMissing` for an unregistered
	/// remotable
	pub(crate) fn encode_existing(&self, key: &Passable) -> Result<String, Error> {
		codec::encode_key(key, |slot| {
			self.ordinal_of(slot)?.ok_or_else(|| Error::OrdinalMissing(slot.to_owned()))
		})
	}

	/// Encode a key, mapping an unregistered remotable to absence
	fn encode_present(&self, key: &Passable) -> Result<Option<String>, Error> {
		match self.encode_existing(key) {
			Ok(encoded) => Ok(Some(encoded)),
			Err(Error::OrdinalMissing(_)) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Encode a key, assigning an ordinal to a first-seen remotable
	fn encode_fresh(&self, key: &Passable) -> Result<String, Error> {
		codec::encode_key(key, |slot| self.allocate_ordinal(slot))
	}

	pub(crate) fn read_raw_row(&self, raw: &str) -> Result<CapData, Error> {
		Ok(serde_json::from_str(raw)?)
	}

	pub(crate) fn unserialize(&self, data: &CapData) -> Result<Passable, Error> {
		self.inner.marshaller.unserialize(data)
	}

	fn read_row(&self, encoded: &str) -> Result<Option<CapData>, Error> {
		match self.inner.store.get(&key::entry(self.inner.collection_id, encoded)) {
			None => Ok(None),
			Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
		}
	}

	fn write_row(&self, encoded: &str, data: &CapData) -> Result<(), Error> {
		let raw = serde_json::to_string(data)?;
		self.inner.store.set(&key::entry(self.inner.collection_id, encoded), &raw);
		Ok(())
	}

	/// Remove one entry, maintaining counts and ordinal rows, without
	/// touching the generation counter
	fn delete_entry(&self, key: &Passable) -> Result<(), Error> {
		self.check_schema(key)?;
		let encoded = self.encode_present(key)?.ok_or(Error::NotFound)?;
		let data = self.read_row(&encoded)?.ok_or(Error::NotFound)?;
		for slot in &data.slots {
			self.inner.vrm.remove_reachable_vref(slot);
		}
		self.inner.store.delete(&key::entry(self.inner.collection_id, &encoded));
		if let Some(slot) = key.slot() {
			match &self.inner.entry_deleter {
				Some(deleter) => self.inner.vrm.remove_recognizable_value(slot, deleter),
				None => self.inner.vrm.remove_reachable_vref(slot),
			}
			self.inner.store.delete(&key::ordinal(self.inner.collection_id, slot));
		}
		self.bump_size(-1);
		Ok(())
	}

	pub(crate) fn clear_matching(
		&self,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
	) -> Result<(), Error> {
		let trivial = matches!(
			key_pattern,
			None | Some(Pattern::Any) | Some(Pattern::Scalar)
		);
		if trivial {
			match value_pattern {
				None => (),
				Some(p) if p.is_any() => (),
				Some(_) => return Err(Error::UnsupportedValuePattern),
			}
			return self.clear_all();
		}
		// Deleting under an open scan would trip the generation guard, so
		// collect the matching keys first and delete afterwards
		let keys: Vec<Passable> =
			self.keys(key_pattern, value_pattern)?.collect::<Result<_, _>>()?;
		for key in &keys {
			self.delete_entry(key)?;
		}
		Ok(())
	}

	/// Sweep every entry row under the prefix. This is the only deletion
	/// path available to weak collections, whose keys cannot be enumerated.
	fn clear_all(&self) -> Result<(), Error> {
		let upper = format!("{}{}", self.inner.prefix, key::ENTRY_RANGE_END);
		let mut prior = String::new();
		while let Some((db_key, raw)) =
			self.inner.store.get_after(&prior, &self.inner.prefix, Some(&upper))
		{
			let encoded = &db_key[self.inner.prefix.len()..];
			if let Some(slot) = codec::encoded_remotable_slot(encoded) {
				match &self.inner.entry_deleter {
					Some(deleter) => self.inner.vrm.remove_recognizable_value(slot, deleter),
					None => self.inner.vrm.remove_reachable_vref(slot),
				}
				self.inner.store.delete(&key::ordinal(self.inner.collection_id, slot));
			}
			let data: CapData = serde_json::from_str(&raw)?;
			for slot in &data.slots {
				self.inner.vrm.remove_reachable_vref(slot);
			}
			self.inner.store.delete(&db_key);
			prior = db_key;
		}
		self.inner.size.set(Some(0));
		Ok(())
	}

	/// Drop every remaining row under the prefix, entries and metadata both
	pub(crate) fn dispose(&self) -> Result<(), Error> {
		debug!(label = %self.inner.label, vref = %self.vref(), "disposing collection");
		self.clear_all()?;
		let mut prior = String::new();
		while let Some((db_key, _)) =
			self.inner.store.get_after(&prior, &self.inner.prefix, None)
		{
			self.inner.store.delete(&db_key);
			prior = db_key;
		}
		Ok(())
	}

	fn count_entries(&self) -> u64 {
		let upper = format!("{}{}", self.inner.prefix, key::ENTRY_RANGE_END);
		let mut prior = String::new();
		let mut count = 0;
		while let Some((db_key, _)) =
			self.inner.store.get_after(&prior, &self.inner.prefix, Some(&upper))
		{
			prior = db_key;
			count += 1;
		}
		count
	}

	fn bump_size(&self, delta: i64) {
		if let Some(size) = self.inner.size.get() {
			self.inner.size.set(Some(size.saturating_add_signed(delta)));
		}
	}

	fn bump_generation(&self) {
		self.inner.generation.set(self.inner.generation.get() + 1);
	}
}
