//! The passable value domain.
//!
//! A [`Passable`] is a value which may cross a trust boundary: primitives,
//! symbols with canonical names, opaque remote references, and recursive
//! structures built from them. The scalar subset (everything except lists and
//! records) is the key domain of a collection.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Passable {
	Null,
	Undefined,
	Bool(bool),
	/// An IEEE-754 double, including signed zero and NaN
	Number(f64),
	/// An arbitrary-precision integer
	BigInt(BigInt),
	Str(String),
	/// A symbol with a canonical name
	Symbol(String),
	/// An opaque remote reference, identified solely by its slot
	Remotable(String),
	List(Vec<Passable>),
	Record(BTreeMap<String, Passable>),
}

impl Passable {
	/// The pass style of this value
	pub fn pass_style(&self) -> &'static str {
		match self {
			Passable::Null => "null",
			Passable::Undefined => "undefined",
			Passable::Bool(_) => "boolean",
			Passable::Number(_) => "number",
			Passable::BigInt(_) => "bigint",
			Passable::Str(_) => "string",
			Passable::Symbol(_) => "symbol",
			Passable::Remotable(_) => "remotable",
			Passable::List(_) => "copyArray",
			Passable::Record(_) => "copyRecord",
		}
	}

	/// Whether this value belongs to the scalar key domain
	pub fn is_scalar_key(&self) -> bool {
		!matches!(self, Passable::List(_) | Passable::Record(_))
	}

	/// The slot of a remotable, if this value is one
	pub fn slot(&self) -> Option<&str> {
		match self {
			Passable::Remotable(slot) => Some(slot),
			_ => None,
		}
	}
}

/// Key equality. `NaN` equals itself and `+0` equals `-0`, matching the
/// rank-order treatment of numbers by the key codec.
impl PartialEq for Passable {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Passable::Null, Passable::Null) => true,
			(Passable::Undefined, Passable::Undefined) => true,
			(Passable::Bool(a), Passable::Bool(b)) => a == b,
			(Passable::Number(a), Passable::Number(b)) => {
				a == b || (a.is_nan() && b.is_nan())
			}
			(Passable::BigInt(a), Passable::BigInt(b)) => a == b,
			(Passable::Str(a), Passable::Str(b)) => a == b,
			(Passable::Symbol(a), Passable::Symbol(b)) => a == b,
			(Passable::Remotable(a), Passable::Remotable(b)) => a == b,
			(Passable::List(a), Passable::List(b)) => a == b,
			(Passable::Record(a), Passable::Record(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Passable {}

impl From<bool> for Passable {
	fn from(v: bool) -> Self {
		Passable::Bool(v)
	}
}

impl From<f64> for Passable {
	fn from(v: f64) -> Self {
		Passable::Number(v)
	}
}

impl From<BigInt> for Passable {
	fn from(v: BigInt) -> Self {
		Passable::BigInt(v)
	}
}

impl From<&str> for Passable {
	fn from(v: &str) -> Self {
		Passable::Str(v.to_owned())
	}
}

impl From<String> for Passable {
	fn from(v: String) -> Self {
		Passable::Str(v)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_equality_edge_cases() {
		assert_eq!(Passable::Number(f64::NAN), Passable::Number(f64::NAN));
		assert_eq!(Passable::Number(0.0), Passable::Number(-0.0));
		assert_ne!(Passable::Number(1.0), Passable::Number(2.0));
		assert_ne!(Passable::Null, Passable::Undefined);
		assert_eq!(
			Passable::Remotable("o-1".to_owned()),
			Passable::Remotable("o-1".to_owned())
		);
	}

	#[test]
	fn scalar_key_domain() {
		assert!(Passable::Null.is_scalar_key());
		assert!(Passable::from(1.5).is_scalar_key());
		assert!(Passable::Remotable("o-1".to_owned()).is_scalar_key());
		assert!(!Passable::List(vec![]).is_scalar_key());
		assert!(!Passable::Record(BTreeMap::new()).is_scalar_key());
	}
}
