//! Persistent scalar map and set collections over an ordered vat store.
//!
//! A [`CollectionManager`] materialises map-like and set-like containers on
//! top of an external ordered key/value store. Entry keys are encoded so that
//! lexicographic order of the stored rows agrees with the rank order of the
//! decoded keys, which lets prefix range scans answer pattern queries. Opaque
//! remote references are given stable per-collection ordinals, and every
//! reference reachable from a stored entry is pinned (or, for weak keys,
//! recognised) through the host's virtual-reference manager.

#[macro_use]
extern crate tracing;

pub mod coll;
pub mod err;
pub mod key;
pub mod kvs;
pub mod marshal;
pub mod mgr;
pub mod ptn;
pub mod val;
pub mod vrm;

pub use self::coll::{AnyStore, MapStore, SetStore, WeakMapStore, WeakSetStore};
pub use self::err::Error;
pub use self::mgr::CollectionManager;
pub use self::ptn::Pattern;
pub use self::val::Passable;
