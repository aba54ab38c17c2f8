//! The pattern subset used for key schemas and queries.
//!
//! A collection's key schema is a pattern checked on every keyed operation,
//! and iteration narrows its range scan to the rank cover of the key pattern
//! it was given. Only the `any` value pattern is supported; value schemas are
//! reserved.

use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::key::ENTRY_RANGE_END;
use crate::val::Passable;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Pattern {
	/// Matches every passable
	Any,
	/// Matches every scalar key
	#[default]
	Scalar,
	/// Matches exactly one key
	Eq(Passable),
}

impl Pattern {
	/// Whether a specimen matches this pattern
	pub fn matches(&self, specimen: &Passable) -> bool {
		match self {
			Pattern::Any => true,
			Pattern::Scalar => specimen.is_scalar_key(),
			Pattern::Eq(key) => key == specimen,
		}
	}

	/// Whether this pattern trivially matches every value
	pub fn is_any(&self) -> bool {
		matches!(self, Pattern::Any)
	}

	/// Encoded-key bounds over-approximating the match set of this pattern.
	/// The encoder is collection-specific because remotables order by their
	/// per-collection ordinal.
	pub fn rank_cover<F>(&self, mut encode: F) -> Result<(String, String), Error>
	where
		F: FnMut(&Passable) -> Result<String, Error>,
	{
		match self {
			Pattern::Any | Pattern::Scalar => {
				Ok((String::new(), ENTRY_RANGE_END.to_owned()))
			}
			Pattern::Eq(key) => {
				let lower = encode(key)?;
				let upper = format!("{lower}\0");
				Ok((lower, upper))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::key::codec;

	fn encode(key: &Passable) -> Result<String, Error> {
		codec::encode_key(key, |_| Ok(1))
	}

	#[test]
	fn matching() {
		assert!(Pattern::Any.matches(&Passable::List(vec![])));
		assert!(Pattern::Scalar.matches(&Passable::Number(1.0)));
		assert!(!Pattern::Scalar.matches(&Passable::List(vec![])));
		assert!(Pattern::Eq("a".into()).matches(&"a".into()));
		assert!(!Pattern::Eq("a".into()).matches(&"b".into()));
	}

	#[test]
	fn full_cover_spans_every_tag() {
		let (lower, upper) = Pattern::Scalar.rank_cover(encode).unwrap();
		for key in [Passable::Null, Passable::Bool(false), "x".into(), 1.5.into()] {
			let encoded = encode(&key).unwrap();
			assert!(encoded.as_str() >= lower.as_str() && encoded.as_str() < upper.as_str());
		}
	}

	#[test]
	fn eq_cover_is_tight() {
		let (lower, upper) = Pattern::Eq("b".into()).rank_cover(encode).unwrap();
		assert_eq!(lower, "sb");
		assert!("sb" >= lower.as_str() && "sb" < upper.as_str());
		assert!(!("sba" < upper.as_str()));
		assert!("sa" < lower.as_str());
	}

	#[test]
	fn schemas_round_trip_through_serde() {
		for pattern in [
			Pattern::Any,
			Pattern::Scalar,
			Pattern::Eq(Passable::Remotable("o-3".to_owned())),
			Pattern::Eq(Passable::BigInt(42.into())),
		] {
			let row = serde_json::to_string(&pattern).unwrap();
			let back: Pattern = serde_json::from_str(&row).unwrap();
			assert_eq!(back, pattern);
		}
	}
}
