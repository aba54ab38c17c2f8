//! The marshal interface.
//!
//! Values are stored in their transport form: a serialized body plus the
//! ordered table of slots the value mentions. The engine never interprets the
//! body itself; it only needs the slot table for reference counting, and the
//! marshaller to get values in and out of it.

pub mod json;

use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::val::Passable;

/// A value in transport form: a serialized body and the slots it mentions,
/// in first-appearance order
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CapData {
	pub body: String,
	pub slots: Vec<String>,
}

pub trait Marshaller {
	/// Serialize a value to transport form
	fn serialize(&self, value: &Passable) -> Result<CapData, Error>;
	/// Rebuild a value from transport form
	fn unserialize(&self, data: &CapData) -> Result<Passable, Error>;
}
