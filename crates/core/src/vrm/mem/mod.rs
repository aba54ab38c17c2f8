use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Deleter, Disposer, Reanimator, ReferenceManager};
use crate::err::Error;
use crate::key;

/// An in-process reference manager.
///
/// Keeps reachability counts and recogniser registrations in memory, and
/// exposes the host-side events the engine reacts to: [`MemReferenceManager::reclaim`]
/// models a recognised object being collected elsewhere,
/// [`MemReferenceManager::retire`] models the last handle of a collection
/// going away, and [`MemReferenceManager::reanimate`] models a forgotten
/// external identifier being re-encountered.
#[derive(Default)]
#[non_exhaustive]
pub struct MemReferenceManager {
	counts: RefCell<HashMap<String, u64>>,
	recognizers: RefCell<HashMap<String, Vec<Deleter>>>,
	reanimators: RefCell<HashMap<u64, Reanimator>>,
	droppables: RefCell<HashMap<String, Disposer>>,
}

impl MemReferenceManager {
	pub fn new() -> MemReferenceManager {
		MemReferenceManager::default()
	}

	/// The current reachability count of a slot
	pub fn refcount(&self, slot: &str) -> u64 {
		self.counts.borrow().get(slot).copied().unwrap_or(0)
	}

	/// Whether any collection currently recognises a slot
	pub fn is_recognized(&self, slot: &str) -> bool {
		self.recognizers.borrow().get(slot).is_some_and(|d| !d.is_empty())
	}

	/// The reclamation of an unreferenced object: every recogniser of the
	/// slot is told, exactly once, and then forgotten
	pub fn reclaim(&self, slot: &str) {
		let deleters = self.recognizers.borrow_mut().remove(slot).unwrap_or_default();
		trace!(slot, deleters = deleters.len(), "reclaiming slot");
		for deleter in deleters {
			deleter(slot);
		}
	}

	/// The collection of a dropped collection handle: its registered
	/// disposer runs and is forgotten
	pub fn retire(&self, vref: &str) {
		if let Some(disposer) = self.droppables.borrow_mut().remove(vref) {
			trace!(vref, "retiring collection");
			disposer();
		}
	}

	/// Rebuild a live handle for a previously created collection
	pub fn reanimate(&self, vref: &str) -> Result<Box<dyn Any>, Error> {
		let (kind_id, _) = key::parse_vref(vref)?;
		let reanimator = self
			.reanimators
			.borrow()
			.get(&kind_id)
			.cloned()
			.ok_or(Error::KindUnknown(kind_id))?;
		reanimator(vref)
	}
}

impl ReferenceManager for MemReferenceManager {
	fn add_reachable_vref(&self, slot: &str) {
		*self.counts.borrow_mut().entry(slot.to_owned()).or_insert(0) += 1;
	}

	fn remove_reachable_vref(&self, slot: &str) {
		let mut counts = self.counts.borrow_mut();
		if let Some(count) = counts.get_mut(slot) {
			*count -= 1;
			if *count == 0 {
				counts.remove(slot);
			}
		}
	}

	fn update_reference_counts(&self, before: &[String], after: &[String]) {
		// Additions land first so shared slots never cross zero
		for slot in after {
			self.add_reachable_vref(slot);
		}
		for slot in before {
			self.remove_reachable_vref(slot);
		}
	}

	fn add_recognizable_value(&self, slot: &str, deleter: &Deleter) {
		self.recognizers
			.borrow_mut()
			.entry(slot.to_owned())
			.or_default()
			.push(deleter.clone());
	}

	fn remove_recognizable_value(&self, slot: &str, deleter: &Deleter) {
		let mut recognizers = self.recognizers.borrow_mut();
		if let Some(deleters) = recognizers.get_mut(slot) {
			deleters.retain(|d| !Rc::ptr_eq(d, deleter));
			if deleters.is_empty() {
				recognizers.remove(slot);
			}
		}
	}

	fn register_reanimator(&self, kind_id: u64, reanimator: Reanimator) {
		self.reanimators.borrow_mut().insert(kind_id, reanimator);
	}

	fn register_dropped_collection(&self, vref: &str, _key_prefix: &str, disposer: Disposer) {
		self.droppables.borrow_mut().insert(vref.to_owned(), disposer);
	}
}
