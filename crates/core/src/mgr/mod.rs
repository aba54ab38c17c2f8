//! Collection lifecycle: the kind registry, creation, reanimation, and
//! disposal.
//!
//! The manager owns the process-wide pieces of state: the persistent table
//! mapping kind names to kind ids, the collection id allocator, and the
//! reanimators it registers with the reference manager so a dangling
//! external identifier can be turned back into a live handle on demand.

use std::any::Any;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::instrument;

use crate::coll::{
	self, AnyStore, Collection, MapStore, SetStore, WeakMapStore, WeakSetStore,
};
use crate::err::Error;
use crate::key;
use crate::kvs::VatStore;
use crate::marshal::Marshaller;
use crate::ptn::Pattern;
use crate::vrm::{Deleter, Disposer, Reanimator, ReferenceManager};

/// The known collection kinds and whether their keys are weak
const KINDS: [(&str, bool); 4] = [
	("scalarMapStore", false),
	("scalarWeakMapStore", true),
	("scalarSetStore", false),
	("scalarWeakSetStore", true),
];

/// The per-process façade for creating and reviving collections
pub struct CollectionManager {
	inner: Rc<ManagerInner>,
}

struct ManagerInner {
	store: Rc<dyn VatStore>,
	vrm: Rc<dyn ReferenceManager>,
	marshaller: Rc<dyn Marshaller>,
	/// Kind name to kind id, loaded or initialised at construction
	kind_ids: BTreeMap<String, u64>,
	next_collection_id: Cell<u64>,
}

impl CollectionManager {
	/// Construct a manager over a vat store. The kind table is read back
	/// from the store; kind names never seen before are assigned fresh
	/// export ids and the table is persisted again. Re-construction over the
	/// same store allocates nothing.
	pub fn new(
		store: Rc<dyn VatStore>,
		vrm: Rc<dyn ReferenceManager>,
		marshaller: Rc<dyn Marshaller>,
		mut allocate_export_id: impl FnMut() -> u64,
	) -> Result<CollectionManager, Error> {
		let mut kind_ids: BTreeMap<String, u64> = match store.get(key::KIND_TABLE) {
			Some(raw) => serde_json::from_str(&raw)?,
			None => BTreeMap::new(),
		};
		let mut dirty = false;
		for (name, _) in KINDS {
			if !kind_ids.contains_key(name) {
				let kind_id = allocate_export_id();
				trace!(name, kind_id, "registered collection kind");
				kind_ids.insert(name.to_owned(), kind_id);
				dirty = true;
			}
		}
		if dirty {
			store.set(key::KIND_TABLE, &serde_json::to_string(&kind_ids)?);
		}
		let next_collection_id = match store.get(key::NEXT_COLLECTION_ID) {
			Some(raw) => raw
				.parse()
				.map_err(|_| Error::MetadataCorruption(key::NEXT_COLLECTION_ID.to_owned()))?,
			None => 1,
		};
		let inner = Rc::new(ManagerInner {
			store,
			vrm,
			marshaller,
			kind_ids,
			next_collection_id: Cell::new(next_collection_id),
		});
		// Revival of a forgotten identifier goes through the reference
		// manager, which only holds a weak path back to this manager
		for (name, _) in KINDS {
			let kind_id = inner.kind_id(name)?;
			let weak = Rc::downgrade(&inner);
			let reanimator: Reanimator = Rc::new(move |vref: &str| {
				let inner = weak.upgrade().ok_or(Error::KindUnknown(kind_id))?;
				let store = inner.reanimate_store(vref)?;
				Ok(Box::new(store) as Box<dyn Any>)
			});
			inner.vrm.register_reanimator(kind_id, reanimator);
		}
		Ok(CollectionManager {
			inner,
		})
	}

	/// Create a strong-keyed map store
	pub fn make_map_store(
		&self,
		label: &str,
		key_schema: Option<Pattern>,
	) -> Result<MapStore, Error> {
		Ok(MapStore(self.make_collection(label, "scalarMapStore", key_schema)?))
	}

	/// Create a strong-keyed set store
	pub fn make_set_store(
		&self,
		label: &str,
		key_schema: Option<Pattern>,
	) -> Result<SetStore, Error> {
		Ok(SetStore(self.make_collection(label, "scalarSetStore", key_schema)?))
	}

	/// Create a weak-keyed map store
	pub fn make_weak_map_store(
		&self,
		label: &str,
		key_schema: Option<Pattern>,
	) -> Result<WeakMapStore, Error> {
		Ok(WeakMapStore(self.make_collection(label, "scalarWeakMapStore", key_schema)?))
	}

	/// Create a weak-keyed set store
	pub fn make_weak_set_store(
		&self,
		label: &str,
		key_schema: Option<Pattern>,
	) -> Result<WeakSetStore, Error> {
		Ok(WeakSetStore(self.make_collection(label, "scalarWeakSetStore", key_schema)?))
	}

	/// Rebuild a live handle from an external collection identifier. The
	/// new handle shares the persistent rows with any other handle of the
	/// same collection, but not its in-memory state.
	pub fn reanimate(&self, vref: &str) -> Result<AnyStore, Error> {
		self.inner.reanimate_store(vref)
	}

	/// Allocate a new collection: persist its metadata triple, register its
	/// disposer, and hand back the live handle
	#[instrument(level = "debug", skip(self, key_schema))]
	fn make_collection(
		&self,
		label: &str,
		kind_name: &'static str,
		key_schema: Option<Pattern>,
	) -> Result<Collection, Error> {
		let inner = &self.inner;
		let key_schema = key_schema.unwrap_or_default();
		let collection_id = inner.next_collection_id.get();
		inner.next_collection_id.set(collection_id + 1);
		inner.store.set(key::NEXT_COLLECTION_ID, &(collection_id + 1).to_string());
		inner.store.set(&key::label(collection_id), label);
		inner.store.set(&key::schema(collection_id), &serde_json::to_string(&key_schema)?);
		inner.store.set(&key::next_ordinal(collection_id), "1");
		// Weak kinds share one deleter identity between the live handle and
		// the disposer, so disposal can retract what the handle registered
		let entry_deleter = kind_is_weak(kind_name)
			.then(|| coll::make_entry_deleter(&inner.store, &inner.vrm, collection_id));
		let coll = inner.open_collection(
			label.to_owned(),
			collection_id,
			kind_name,
			key_schema,
			true,
			entry_deleter.clone(),
		)?;
		let vref = coll.vref();
		let disposer = self.disposer(collection_id, kind_name, entry_deleter);
		inner.vrm.register_dropped_collection(&vref, &key::prefix(collection_id), disposer);
		debug!(label, vref = %vref, "created collection");
		Ok(coll)
	}

	/// The disposer runs when the last handle of a collection goes away. It
	/// captures only the collection identity, never the handle.
	fn disposer(
		&self,
		collection_id: u64,
		kind_name: &'static str,
		entry_deleter: Option<Deleter>,
	) -> Disposer {
		let weak = Rc::downgrade(&self.inner);
		Rc::new(move || {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let disposed = inner
				.load_collection(collection_id, kind_name, entry_deleter.clone())
				.and_then(|coll| coll.dispose());
			if let Err(error) = disposed {
				warn!(%error, collection_id, "failed to dispose collection");
			}
		})
	}
}

fn kind_is_weak(kind_name: &str) -> bool {
	KINDS.iter().any(|(name, weak)| *name == kind_name && *weak)
}

impl ManagerInner {
	fn kind_id(&self, kind_name: &str) -> Result<u64, Error> {
		self.kind_ids
			.get(kind_name)
			.copied()
			.ok_or_else(|| Error::MetadataCorruption(key::KIND_TABLE.to_owned()))
	}

	#[allow(clippy::too_many_arguments)]
	fn open_collection(
		&self,
		label: String,
		collection_id: u64,
		kind_name: &'static str,
		key_schema: Pattern,
		fresh: bool,
		entry_deleter: Option<Deleter>,
	) -> Result<Collection, Error> {
		let kind_id = self.kind_id(kind_name)?;
		Ok(Collection::open(
			self.store.clone(),
			self.vrm.clone(),
			self.marshaller.clone(),
			label,
			collection_id,
			kind_id,
			entry_deleter,
			key_schema,
			fresh,
		))
	}

	/// Build a live handle from the persistent rows of an existing
	/// collection
	fn load_collection(
		&self,
		collection_id: u64,
		kind_name: &'static str,
		entry_deleter: Option<Deleter>,
	) -> Result<Collection, Error> {
		let schema_row = key::schema(collection_id);
		let raw = self
			.store
			.get(&schema_row)
			.ok_or(Error::MetadataCorruption(schema_row))?;
		let key_schema: Pattern = serde_json::from_str(&raw)?;
		let label_row = key::label(collection_id);
		let label = self
			.store
			.get(&label_row)
			.ok_or(Error::MetadataCorruption(label_row))?;
		self.open_collection(label, collection_id, kind_name, key_schema, false, entry_deleter)
	}

	fn reanimate_store(&self, vref: &str) -> Result<AnyStore, Error> {
		let (kind_id, collection_id) = key::parse_vref(vref)?;
		let kind_name = KINDS
			.iter()
			.find(|(name, _)| self.kind_ids.get(*name) == Some(&kind_id))
			.map(|(name, _)| *name)
			.ok_or(Error::KindUnknown(kind_id))?;
		debug!(vref, kind_name, "reanimating collection");
		// A reanimated weak handle gets a deleter of its own
		let entry_deleter = kind_is_weak(kind_name)
			.then(|| coll::make_entry_deleter(&self.store, &self.vrm, collection_id));
		let coll = self.load_collection(collection_id, kind_name, entry_deleter)?;
		Ok(match kind_name {
			"scalarMapStore" => AnyStore::Map(MapStore(coll)),
			"scalarWeakMapStore" => AnyStore::WeakMap(WeakMapStore(coll)),
			"scalarSetStore" => AnyStore::Set(SetStore(coll)),
			_ => AnyStore::WeakSet(WeakSetStore(coll)),
		})
	}
}
