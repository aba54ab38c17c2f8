//! Lazy range iteration over a collection.
//!
//! A scan probes the store with resumable "get strictly after" requests,
//! bounded by the rank cover of its key pattern. It is single-pass and not
//! restartable, and a structural mutation of the collection between two
//! steps surfaces as [`Error::ConcurrentModification`].

use super::Collection;
use crate::err::Error;
use crate::key::codec;
use crate::ptn::Pattern;
use crate::val::Passable;

pub(super) fn keys(
	coll: &Collection,
	key_pattern: Option<Pattern>,
	value_pattern: Option<Pattern>,
) -> Result<Keys, Error> {
	Ok(Keys {
		scan: Scan::new(coll, key_pattern, value_pattern, false)?,
	})
}

pub(super) fn values(
	coll: &Collection,
	key_pattern: Option<Pattern>,
	value_pattern: Option<Pattern>,
) -> Result<Values, Error> {
	Ok(Values {
		scan: Scan::new(coll, key_pattern, value_pattern, true)?,
	})
}

pub(super) fn entries(
	coll: &Collection,
	key_pattern: Option<Pattern>,
	value_pattern: Option<Pattern>,
) -> Result<Entries, Error> {
	Ok(Entries {
		scan: Scan::new(coll, key_pattern, value_pattern, true)?,
	})
}

/// One in-progress range scan
struct Scan {
	coll: Collection,
	key_pattern: Pattern,
	value_pattern: Pattern,
	/// Whether the caller wants values deserialized at all
	need_values: bool,
	generation_at_start: u64,
	/// The last row visited; probes resume strictly after it
	prior: String,
	lower: String,
	upper: String,
	done: bool,
}

impl Scan {
	fn new(
		coll: &Collection,
		key_pattern: Option<Pattern>,
		value_pattern: Option<Pattern>,
		need_values: bool,
	) -> Result<Scan, Error> {
		// Value schemas are reserved
		let value_pattern = match value_pattern {
			None => Pattern::Any,
			Some(p) if p.is_any() => p,
			Some(_) => return Err(Error::UnsupportedValuePattern),
		};
		let key_pattern = key_pattern.unwrap_or_default();
		// The rank cover bounds the scan to rows which could possibly match
		let (done, lower, upper) = match key_pattern.rank_cover(|k| coll.encode_existing(k)) {
			Ok((lo, hi)) => (
				false,
				format!("{}{lo}", coll.prefix()),
				format!("{}{hi}", coll.prefix()),
			),
			// A remotable this collection never keyed matches nothing
			Err(Error::OrdinalMissing(_)) => (true, String::new(), String::new()),
			Err(e) => return Err(e),
		};
		Ok(Scan {
			coll: coll.clone(),
			key_pattern,
			value_pattern,
			need_values,
			generation_at_start: coll.generation(),
			prior: String::new(),
			lower,
			upper,
			done,
		})
	}

	fn step(&mut self) -> Option<Result<(Passable, Option<Passable>), Error>> {
		if self.done {
			return None;
		}
		loop {
			// Any structural mutation since the scan began poisons it
			if self.coll.generation() != self.generation_at_start {
				self.done = true;
				return Some(Err(Error::ConcurrentModification));
			}
			let probe =
				self.coll.store().get_after(&self.prior, &self.lower, Some(&self.upper));
			let Some((db_key, raw)) = probe else {
				self.done = true;
				return None;
			};
			if db_key.as_str() >= self.upper.as_str() {
				self.done = true;
				return None;
			}
			let decoded = codec::decode_key(&db_key[self.coll.prefix().len()..]);
			self.prior = db_key;
			let key = match decoded {
				Ok(key) => key,
				Err(e) => {
					self.done = true;
					return Some(Err(e));
				}
			};
			if !self.key_pattern.matches(&key) {
				continue;
			}
			if self.need_values || !self.value_pattern.is_any() {
				let value = match self.read_value(&raw) {
					Ok(value) => value,
					Err(e) => {
						self.done = true;
						return Some(Err(e));
					}
				};
				if !self.value_pattern.matches(&value) {
					continue;
				}
				return Some(Ok((key, Some(value))));
			}
			return Some(Ok((key, None)));
		}
	}

	fn read_value(&self, raw: &str) -> Result<Passable, Error> {
		let data = self.coll.read_raw_row(raw)?;
		self.coll.unserialize(&data)
	}
}

/// Lazy iterator over matching keys, in encoded-key order
pub struct Keys {
	scan: Scan,
}

impl Iterator for Keys {
	type Item = Result<Passable, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		self.scan.step().map(|step| step.map(|(key, _)| key))
	}
}

/// Lazy iterator over the values of matching entries
pub struct Values {
	scan: Scan,
}

impl Iterator for Values {
	type Item = Result<Passable, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		self.scan
			.step()
			.map(|step| step.map(|(_, value)| value.unwrap_or(Passable::Undefined)))
	}
}

/// Lazy iterator over matching entries as key/value pairs
pub struct Entries {
	scan: Scan,
}

impl Iterator for Entries {
	type Item = Result<(Passable, Passable), Error>;

	fn next(&mut self) -> Option<Self::Item> {
		self.scan
			.step()
			.map(|step| step.map(|(key, value)| (key, value.unwrap_or(Passable::Undefined))))
	}
}
