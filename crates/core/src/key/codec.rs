//! Rank-preserving key codec.
//!
//! Each scalar key is encoded as a string whose first byte names the variant
//! and whose tail encodes the value, such that lexicographic comparison of
//! encoded strings agrees with the rank order of the decoded keys. Tags in
//! rank order: `b` boolean, `f` number, `n` negative bigint, `p` non-negative
//! bigint, `r` remotable, `s` string, `u` undefined, `y` symbol, `z` null.

use num_bigint::{BigInt, BigUint, Sign};

use crate::err::Error;
use crate::val::Passable;

/// Fixed width of remotable ordinals and bigint length tags
pub const ORDINAL_WIDTH: usize = 10;

/// One past the largest value expressible in [`ORDINAL_WIDTH`] digits
pub const ORDINAL_SPACE: u64 = 10_000_000_000;

const SIGN_BIT: u64 = 1 << 63;
const LENGTH_SPACE: u64 = ORDINAL_SPACE;

/// Encode a scalar key so that byte order matches rank order. Remotables have
/// no canonical ordering of their own, so their per-collection ordinal is
/// supplied by the caller.
pub fn encode_key<F>(key: &Passable, mut ordinal_of: F) -> Result<String, Error>
where
	F: FnMut(&str) -> Result<u64, Error>,
{
	match key {
		Passable::Null => Ok("z".to_owned()),
		Passable::Undefined => Ok("u".to_owned()),
		Passable::Bool(b) => Ok(format!("b{b}")),
		Passable::Number(n) => Ok(encode_number(*n)),
		Passable::BigInt(n) => Ok(encode_bigint(n)),
		Passable::Str(s) => Ok(format!("s{s}")),
		Passable::Symbol(name) => Ok(format!("y{name}")),
		Passable::Remotable(slot) => {
			let ordinal = ordinal_of(slot)?;
			Ok(encode_remotable_key(ordinal, slot))
		}
		other => Err(Error::UnsupportedKeyPassStyle(other.pass_style().to_owned())),
	}
}

/// Decode an encoded key back into a scalar. Inverse of [`encode_key`] for
/// every well-formed input.
pub fn decode_key(encoded: &str) -> Result<Passable, Error> {
	let corrupt = || Error::DecodeCorruption(encoded.to_owned());
	let Some(tag) = encoded.chars().next() else {
		return Err(corrupt());
	};
	let body = &encoded[tag.len_utf8()..];
	match tag {
		'z' if body.is_empty() => Ok(Passable::Null),
		'u' if body.is_empty() => Ok(Passable::Undefined),
		'b' => match body {
			"true" => Ok(Passable::Bool(true)),
			"false" => Ok(Passable::Bool(false)),
			_ => Err(corrupt()),
		},
		'f' => decode_number(body).ok_or_else(corrupt),
		'n' => decode_bigint(body, Sign::Minus).ok_or_else(corrupt),
		'p' => decode_bigint(body, Sign::Plus).ok_or_else(corrupt),
		's' => Ok(Passable::Str(body.to_owned())),
		'y' => Ok(Passable::Symbol(body.to_owned())),
		'r' => decode_remotable(body).ok_or_else(corrupt),
		_ => Err(corrupt()),
	}
}

/// Encode a remotable given its per-collection ordinal
pub fn encode_remotable_key(ordinal: u64, slot: &str) -> String {
	format!("r{ordinal:0width$}:{slot}", width = ORDINAL_WIDTH)
}

/// Extract the slot of an encoded remotable key without a full decode
pub fn encoded_remotable_slot(encoded: &str) -> Option<&str> {
	let body = encoded.strip_prefix('r')?;
	if !well_formed_ordinal(body) {
		return None;
	}
	Some(&body[ORDINAL_WIDTH + 1..])
}

/// Whether the body starts with a zero-padded ordinal field and separator
fn well_formed_ordinal(body: &str) -> bool {
	let bytes = body.as_bytes();
	bytes.len() > ORDINAL_WIDTH + 1
		&& bytes[..ORDINAL_WIDTH].iter().all(|b| b.is_ascii_digit())
		&& bytes[ORDINAL_WIDTH] == b':'
}

/// Numbers are encoded by reinterpreting the double as 64 unsigned bits. A
/// set sign bit means the value is negative, so all 64 bits are complemented;
/// otherwise only the sign bit is flipped. The resulting 16 hex digits sort
/// in IEEE total order with NaN after all finite values.
fn encode_number(n: f64) -> String {
	// Collapse the zero and NaN cohorts to a single rank position each
	let n = if n == 0.0 {
		0.0
	} else if n.is_nan() {
		f64::NAN
	} else {
		n
	};
	let bits = n.to_bits();
	let bits = if n < 0.0 {
		!bits
	} else {
		bits ^ SIGN_BIT
	};
	format!("f{bits:016x}")
}

fn decode_number(body: &str) -> Option<Passable> {
	if body.len() != 16 || !body.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
		return None;
	}
	let bits = u64::from_str_radix(body, 16).ok()?;
	let bits = if bits & SIGN_BIT != 0 {
		bits ^ SIGN_BIT
	} else {
		!bits
	};
	Some(Passable::Number(f64::from_bits(bits)))
}

/// Bigints are sign-encoded and length-tagged. Non-negative values sort by
/// magnitude because the zero-padded length field orders first and the digits
/// break ties. For negative values the length tag is complemented so larger
/// magnitudes sort earlier, and the digit field holds the ten's complement so
/// less-negative values sort later.
fn encode_bigint(n: &BigInt) -> String {
	let digits = n.magnitude().to_str_radix(10);
	let len = digits.len() as u64;
	match n.sign() {
		Sign::Minus => {
			let complement = pow10(digits.len()) - n.magnitude();
			let complement = complement.to_str_radix(10);
			format!(
				"n{:0w$}:{complement:0>dw$}",
				LENGTH_SPACE - len,
				w = ORDINAL_WIDTH,
				dw = digits.len()
			)
		}
		_ => format!("p{len:0w$}:{digits}", w = ORDINAL_WIDTH),
	}
}

fn decode_bigint(body: &str, sign: Sign) -> Option<Passable> {
	let (len_field, digits) = body.split_once(':')?;
	if len_field.len() != ORDINAL_WIDTH || !len_field.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	if !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let tagged = len_field.parse::<u64>().ok()?;
	let len = match sign {
		Sign::Minus => LENGTH_SPACE.checked_sub(tagged)?,
		_ => tagged,
	};
	if digits.len() as u64 != len {
		return None;
	}
	let field = BigUint::parse_bytes(digits.as_bytes(), 10)?;
	let value = match sign {
		Sign::Minus => {
			// The digit field is 10^len - |n|, so |n| = 10^len - field
			let bound = pow10(digits.len());
			if field >= bound {
				return None;
			}
			-BigInt::from(bound - field)
		}
		_ => BigInt::from(field),
	};
	Some(Passable::BigInt(value))
}

fn decode_remotable(body: &str) -> Option<Passable> {
	if !well_formed_ordinal(body) {
		return None;
	}
	Some(Passable::Remotable(body[ORDINAL_WIDTH + 1..].to_owned()))
}

fn pow10(exponent: usize) -> BigUint {
	BigUint::from(10u32).pow(exponent as u32)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use num_bigint::BigInt;

	use super::*;

	fn enc(key: &Passable) -> String {
		encode_key(key, |slot| {
			Err(Error::OrdinalMissing(slot.to_owned()))
		})
		.unwrap()
	}

	fn round_trip(key: Passable) {
		assert_eq!(decode_key(&enc(&key)).unwrap(), key);
	}

	#[test]
	fn scalar_round_trips() {
		round_trip(Passable::Null);
		round_trip(Passable::Undefined);
		round_trip(Passable::Bool(true));
		round_trip(Passable::Bool(false));
		round_trip(Passable::Str(String::new()));
		round_trip(Passable::Str("hello".to_owned()));
		round_trip(Passable::Symbol("Symbol(iterator)".to_owned()));
		for n in [
			0.0,
			1.0,
			-1.0,
			1.5,
			-1.5,
			f64::MIN,
			f64::MAX,
			f64::MIN_POSITIVE,
			f64::INFINITY,
			f64::NEG_INFINITY,
			f64::NAN,
		] {
			round_trip(Passable::Number(n));
		}
		for n in [0i64, 1, -1, 7, -7, 10, -10, 12345678901234567, -12345678901234567] {
			round_trip(Passable::BigInt(BigInt::from(n)));
		}
	}

	#[test]
	fn remotable_round_trip() {
		let key = Passable::Remotable("o-34".to_owned());
		let encoded = encode_key(&key, |_| Ok(12)).unwrap();
		assert_eq!(encoded, "r0000000012:o-34");
		assert_eq!(decode_key(&encoded).unwrap(), key);
		assert_eq!(encoded_remotable_slot(&encoded), Some("o-34"));
	}

	#[test]
	fn signed_zero_collides() {
		assert_eq!(enc(&Passable::Number(0.0)), enc(&Passable::Number(-0.0)));
	}

	#[test]
	fn number_rank_order() {
		let ladder = [
			f64::NEG_INFINITY,
			f64::MIN,
			-1.5,
			-1.0,
			-f64::MIN_POSITIVE,
			0.0,
			f64::MIN_POSITIVE,
			1.0,
			1.5,
			f64::MAX,
			f64::INFINITY,
			f64::NAN,
		];
		for pair in ladder.windows(2) {
			let (a, b) = (enc(&Passable::Number(pair[0])), enc(&Passable::Number(pair[1])));
			assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
		}
	}

	#[test]
	fn bigint_rank_order() {
		let ladder: Vec<BigInt> = [
			-1_000_000i64,
			-100_000,
			-100,
			-99,
			-11,
			-10,
			-9,
			-2,
			-1,
			0,
			1,
			2,
			9,
			10,
			11,
			99,
			100,
			100_000,
			1_000_000,
		]
		.into_iter()
		.map(BigInt::from)
		.collect();
		for pair in ladder.windows(2) {
			let (a, b) = (enc(&pair[0].clone().into()), enc(&pair[1].clone().into()));
			assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
		}
	}

	#[test]
	fn bigint_magnitude_boundaries() {
		// Crossing a power of ten changes the length tag, not the order
		for k in [1u32, 2, 5, 15] {
			let pow: BigInt = BigInt::from(10).pow(k);
			let below: BigInt = &pow - 1;
			let above: BigInt = &pow + 1;
			assert!(enc(&below.clone().into()) < enc(&pow.clone().into()));
			assert!(enc(&pow.clone().into()) < enc(&above.clone().into()));
			let npow = -pow.clone();
			assert!(enc(&(-above).into()) < enc(&npow.clone().into()));
			assert!(enc(&npow.into()) < enc(&(-below).into()));
		}
	}

	#[test]
	fn string_rank_order() {
		assert!(enc(&"".into()) < enc(&"a".into()));
		assert!(enc(&"a".into()) < enc(&"aa".into()));
		assert!(enc(&"aa".into()) < enc(&"b".into()));
	}

	#[test]
	fn variant_tag_order() {
		let keys = [
			Passable::Bool(false),
			Passable::Number(1.0),
			Passable::BigInt(BigInt::from(-1)),
			Passable::BigInt(BigInt::from(1)),
			Passable::Str("a".to_owned()),
			Passable::Undefined,
			Passable::Symbol("Symbol(a)".to_owned()),
			Passable::Null,
		];
		for pair in keys.windows(2) {
			assert!(enc(&pair[0]) < enc(&pair[1]));
		}
	}

	#[test]
	fn remotable_ordinal_order() {
		let a = encode_remotable_key(1, "o-9");
		let b = encode_remotable_key(2, "o-1");
		let c = encode_remotable_key(10, "o-5");
		assert!(a < b && b < c);
	}

	#[test]
	fn containers_are_not_keys() {
		let err = encode_key(&Passable::List(vec![]), |_| Ok(0)).unwrap_err();
		assert!(matches!(err, Error::UnsupportedKeyPassStyle(style) if style == "copyArray"));
		let err = encode_key(&Passable::Record(BTreeMap::new()), |_| Ok(0)).unwrap_err();
		assert!(matches!(err, Error::UnsupportedKeyPassStyle(style) if style == "copyRecord"));
	}

	#[test]
	fn corrupt_encodings_are_rejected() {
		for bad in [
			"",
			"q",
			"π0",
			"ztail",
			"utail",
			"btrue ",
			"bmaybe",
			"f",
			"f00",
			"fQ000000000000000",
			"fffff8000000000000ff",
			"p123",
			"p0000000003:12",
			"p000000000x:1",
			"n0000000000:1",
			"n9999999999:x",
			"r123",
			"r000000001x:o-1",
			"r0000000001:",
		] {
			assert!(decode_key(bad).is_err(), "{bad:?} should not decode");
		}
	}
}
