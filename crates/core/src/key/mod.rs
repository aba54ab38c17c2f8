//! How collection rows are laid out in the vat store
///
/// crate::key::kind_table              storeKindIDTable
/// crate::key::next_collection_id      nextCollectionID
///
/// crate::key::label                   vc.{collectionID}.|label
/// crate::key::schema                  vc.{collectionID}.|keySchema
/// crate::key::next_ordinal            vc.{collectionID}.|nextOrdinal
/// crate::key::ordinal                 vc.{collectionID}.|{slot}
/// crate::key::entry                   vc.{collectionID}.{encoded-key}
///
/// Metadata rows carry the `|` marker after the collection prefix. Every
/// encoded entry key starts with a codec tag byte, all of which sort below
/// `{`, which itself sorts below `|`: a scan over `[prefix, prefix{)` visits
/// exactly the entry rows and none of the metadata.
pub mod codec;

use crate::err::Error;

/// Top-level row persisting the kind name to kind id table
pub const KIND_TABLE: &str = "storeKindIDTable";

/// Top-level row persisting the next collection id to issue
pub const NEXT_COLLECTION_ID: &str = "nextCollectionID";

/// Marker distinguishing metadata rows from entry rows within a collection
pub const METADATA_MARKER: char = '|';

/// Exclusive upper bound of the entry range relative to a collection prefix
pub const ENTRY_RANGE_END: &str = "{";

/// The row prefix owned by a collection
pub fn prefix(collection_id: u64) -> String {
	format!("vc.{collection_id}.")
}

/// The label row of a collection
pub fn label(collection_id: u64) -> String {
	format!("vc.{collection_id}.|label")
}

/// The key schema row of a collection
pub fn schema(collection_id: u64) -> String {
	format!("vc.{collection_id}.|keySchema")
}

/// The next ordinal row of a collection
pub fn next_ordinal(collection_id: u64) -> String {
	format!("vc.{collection_id}.|nextOrdinal")
}

/// The ordinal row assigned to a remotable slot within a collection
pub fn ordinal(collection_id: u64, slot: &str) -> String {
	format!("vc.{collection_id}.|{slot}")
}

/// The entry row for an encoded key within a collection
pub fn entry(collection_id: u64, encoded: &str) -> String {
	format!("vc.{collection_id}.{encoded}")
}

/// Format the external identifier of a collection
pub fn vref(kind_id: u64, collection_id: u64) -> String {
	format!("o+{kind_id}/{collection_id}")
}

/// Parse an external collection identifier back into its kind and collection ids
pub fn parse_vref(vref: &str) -> Result<(u64, u64), Error> {
	let corrupt = || Error::VrefCorruption(vref.to_owned());
	let rest = vref.strip_prefix("o+").ok_or_else(corrupt)?;
	let (kind, subid) = rest.split_once('/').ok_or_else(corrupt)?;
	let kind_id = kind.parse::<u64>().map_err(|_| corrupt())?;
	let collection_id = subid.parse::<u64>().map_err(|_| corrupt())?;
	Ok((kind_id, collection_id))
}
