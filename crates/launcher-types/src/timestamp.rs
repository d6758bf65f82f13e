//! ISO-8601 timestamp (de)serialization for persisted records.
//!
//! Timestamps are written as RFC 3339 UTC strings with microsecond precision.
//! Reading also accepts naive ISO-8601 strings without an offset (as written
//! by earlier deployments of the service); those are interpreted as UTC.
//!
//! Use with `#[serde(with = "crate::timestamp")]` or, for optional fields,
//! `#[serde(default, with = "crate::timestamp::option")]`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{de::Error, Deserialize, Deserializer, Serializer};

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
	Utc::now().trunc_subsecs(6)
}

/// Formats a timestamp the way it is persisted.
pub fn format(value: &DateTime<Utc>) -> String {
	value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an RFC 3339 timestamp, falling back to a naive ISO-8601 one.
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
	if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
		return Some(parsed.with_timezone(&Utc));
	}
	value
		.parse::<NaiveDateTime>()
		.ok()
		.map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
}

/// Same as the parent module for `Option<DateTime<Utc>>`.
pub mod option {
	use super::*;

	pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => serializer.serialize_some(&super::format(value)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<String>::deserialize(deserializer)? {
			Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
				D::Error::custom(format!("invalid ISO-8601 timestamp: {raw}"))
			}),
			None => Ok(None),
		}
	}
}
