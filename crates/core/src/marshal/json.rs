use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde_json::{json, Map, Value};

use super::{CapData, Marshaller};
use crate::err::Error;
use crate::val::Passable;

/// A marshaller with a JSON body encoding.
///
/// Passables that JSON can carry directly map to plain JSON values. The rest
/// become single-key tag objects: `{"@undef":null}`, `{"@num":"nan"}`,
/// `{"@big":"-123"}`, `{"@sym":"name"}`, `{"@ref":0}` for remotables (an
/// index into the slot table), and `{"@rec":{...}}` wrapping every record so
/// user keys can never collide with a tag.
#[derive(Default)]
#[non_exhaustive]
pub struct JsonMarshaller;

impl JsonMarshaller {
	pub fn new() -> JsonMarshaller {
		JsonMarshaller
	}
}

impl Marshaller for JsonMarshaller {
	fn serialize(&self, value: &Passable) -> Result<CapData, Error> {
		let mut slots = Vec::new();
		let body = to_body(value, &mut slots);
		Ok(CapData {
			body: serde_json::to_string(&body)?,
			slots,
		})
	}

	fn unserialize(&self, data: &CapData) -> Result<Passable, Error> {
		let body: Value = serde_json::from_str(&data.body)?;
		from_body(&body, &data.slots)
	}
}

fn to_body(value: &Passable, slots: &mut Vec<String>) -> Value {
	match value {
		Passable::Null => Value::Null,
		Passable::Undefined => json!({ "@undef": null }),
		Passable::Bool(b) => Value::Bool(*b),
		Passable::Number(n) if n.is_finite() => json!(n),
		Passable::Number(n) if n.is_nan() => json!({ "@num": "nan" }),
		Passable::Number(n) if *n > 0.0 => json!({ "@num": "+inf" }),
		Passable::Number(_) => json!({ "@num": "-inf" }),
		Passable::BigInt(n) => json!({ "@big": n.to_string() }),
		Passable::Str(s) => Value::String(s.clone()),
		Passable::Symbol(name) => json!({ "@sym": name }),
		Passable::Remotable(slot) => {
			// Slots are listed once, in first-appearance order
			let index = slots.iter().position(|s| s == slot).unwrap_or_else(|| {
				slots.push(slot.clone());
				slots.len() - 1
			});
			json!({ "@ref": index })
		}
		Passable::List(items) => {
			Value::Array(items.iter().map(|item| to_body(item, slots)).collect())
		}
		Passable::Record(fields) => {
			let fields: Map<String, Value> = fields
				.iter()
				.map(|(name, field)| (name.clone(), to_body(field, slots)))
				.collect();
			json!({ "@rec": fields })
		}
	}
}

fn from_body(body: &Value, slots: &[String]) -> Result<Passable, Error> {
	match body {
		Value::Null => Ok(Passable::Null),
		Value::Bool(b) => Ok(Passable::Bool(*b)),
		Value::Number(n) => n
			.as_f64()
			.map(Passable::Number)
			.ok_or_else(|| Error::Marshal(format!("unrepresentable number {n}"))),
		Value::String(s) => Ok(Passable::Str(s.clone())),
		Value::Array(items) => Ok(Passable::List(
			items.iter().map(|item| from_body(item, slots)).collect::<Result<_, _>>()?,
		)),
		Value::Object(fields) => from_tag(fields, slots),
	}
}

fn from_tag(fields: &Map<String, Value>, slots: &[String]) -> Result<Passable, Error> {
	let mut entries = fields.iter();
	let (tag, operand) = match (entries.next(), entries.next()) {
		(Some(entry), None) => entry,
		_ => return Err(Error::Marshal("malformed tag object".to_owned())),
	};
	match (tag.as_str(), operand) {
		("@undef", Value::Null) => Ok(Passable::Undefined),
		("@num", Value::String(n)) => match n.as_str() {
			"nan" => Ok(Passable::Number(f64::NAN)),
			"+inf" => Ok(Passable::Number(f64::INFINITY)),
			"-inf" => Ok(Passable::Number(f64::NEG_INFINITY)),
			_ => Err(Error::Marshal(format!("unknown number token {n:?}"))),
		},
		("@big", Value::String(digits)) => digits
			.parse::<BigInt>()
			.map(Passable::BigInt)
			.map_err(|_| Error::Marshal(format!("unparseable bigint {digits:?}"))),
		("@sym", Value::String(name)) => Ok(Passable::Symbol(name.clone())),
		("@ref", Value::Number(index)) => {
			let index = index
				.as_u64()
				.and_then(|i| usize::try_from(i).ok())
				.filter(|i| *i < slots.len())
				.ok_or_else(|| Error::Marshal(format!("slot index {index} out of range")))?;
			Ok(Passable::Remotable(slots[index].clone()))
		}
		("@rec", Value::Object(fields)) => {
			let fields: BTreeMap<String, Passable> = fields
				.iter()
				.map(|(name, field)| Ok((name.clone(), from_body(field, slots)?)))
				.collect::<Result<_, Error>>()?;
			Ok(Passable::Record(fields))
		}
		_ => Err(Error::Marshal(format!("unknown tag {tag:?}"))),
	}
}
