//! The virtual-reference manager interface.
//!
//! Collections do not own the objects their entries mention; they pin them
//! through the host's reference manager. Strong keys and all value-embedded
//! slots hold a reachability count. Weak keys are merely recognised: the
//! manager promises to invoke the registered deleter if the key is reclaimed
//! elsewhere, so the collection can drop the dangling entry.

pub mod mem;

use std::any::Any;
use std::rc::Rc;

use crate::err::Error;

/// Callback invoked with a slot when a recognised value is reclaimed
pub type Deleter = Rc<dyn Fn(&str)>;

/// Callback that rebuilds a live collection handle from its external
/// identifier. The result is opaque to the reference manager.
pub type Reanimator = Rc<dyn Fn(&str) -> Result<Box<dyn Any>, Error>>;

/// Callback that disposes a collection's persistent rows once its last
/// handle is gone
pub type Disposer = Rc<dyn Fn()>;

pub trait ReferenceManager {
	/// Add one reachability count to a slot
	fn add_reachable_vref(&self, slot: &str);
	/// Remove one reachability count from a slot
	fn remove_reachable_vref(&self, slot: &str);
	/// Apply a refcount delta for a value rewrite. All additions land before
	/// any removal so a slot mentioned on both sides never crosses zero.
	fn update_reference_counts(&self, before: &[String], after: &[String]);
	/// Register interest in a slot without keeping it alive
	fn add_recognizable_value(&self, slot: &str, deleter: &Deleter);
	/// Retract a previously registered recogniser. Deleters are compared by
	/// identity, so a collection can only retract its own registration.
	fn remove_recognizable_value(&self, slot: &str, deleter: &Deleter);
	/// Register the reanimator for a collection kind
	fn register_reanimator(&self, kind_id: u64, reanimator: Reanimator);
	/// Register the disposer to run when a collection is dropped
	fn register_dropped_collection(&self, vref: &str, key_prefix: &str, disposer: Disposer);
}
