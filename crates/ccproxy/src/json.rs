//! Small JSON utilities shared by the translator and provider adapters.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CcproxyError;

/// Reinterpret a serializable value `A` as a deserializable value `B` by round-tripping through
/// `serde_json::Value`. Used throughout the translator to hop between a format's loosely-typed
/// wire struct and the fully-typed `typed` submodule representation without writing a bespoke
/// field-by-field mapping for every pair, mirroring the teacher's `json::convert<A, B>` helper.
pub fn convert<A: Serialize, B: DeserializeOwned>(value: &A) -> Result<B, CcproxyError> {
	let v = serde_json::to_value(value).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
	serde_json::from_value(v).map_err(|e| CcproxyError::TranslationError(e.to_string()))
}
