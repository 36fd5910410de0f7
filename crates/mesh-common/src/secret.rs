// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrapper for key material that must never reach logs.
//!
//! [`Secret<T>`] prints and serializes as `[REDACTED]` and zeroizes its
//! contents on drop. Reading the value requires an explicit `.expose()`.
//! Wire fields that legitimately carry a secret opt in with
//! `#[serde(with = "mesh_common::secret::exposed")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

pub const REDACTED: &str = "[REDACTED]";

#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Call sites must opt in to reading the secret.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl<T> Serialize for Secret<T>
where
	T: Zeroize,
{
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de, T> Deserialize<'de> for Secret<T>
where
	T: Deserialize<'de> + Zeroize,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}
}

/// Serde adapter that writes the inner value instead of the placeholder.
pub mod exposed {
	use super::Secret;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	pub fn serialize<T, S>(secret: &Secret<T>, serializer: S) -> Result<S::Ok, S::Error>
	where
		T: Serialize + Zeroize,
		S: Serializer,
	{
		secret.expose().serialize(serializer)
	}

	pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Secret<T>, D::Error>
	where
		T: Deserialize<'de> + Zeroize,
		D: Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Serialize, Deserialize)]
	struct Envelope {
		#[serde(with = "exposed")]
		key: SecretString,
		hidden: SecretString,
	}

	#[test]
	fn debug_and_display_are_redacted() {
		let secret = Secret::new("wg-private".to_string());
		assert_eq!(format!("{secret:?}"), "Secret(\"[REDACTED]\")");
		assert_eq!(format!("{secret}"), REDACTED);
		assert_eq!(secret.expose(), "wg-private");
	}

	#[test]
	fn only_opted_in_fields_serialize_the_value() {
		let envelope = Envelope {
			key: Secret::new("visible".to_string()),
			hidden: Secret::new("invisible".to_string()),
		};
		let json = serde_json::to_string(&envelope).unwrap();
		assert!(json.contains("\"key\":\"visible\""));
		assert!(json.contains("\"hidden\":\"[REDACTED]\""));
		assert!(!json.contains("invisible"));
	}

	#[test]
	fn deserialize_keeps_value() {
		let envelope: Envelope =
			serde_json::from_str(r#"{"key":"a","hidden":"b"}"#).unwrap();
		assert_eq!(envelope.key.expose(), "a");
		assert_eq!(envelope.hidden.expose(), "b");
	}
}
