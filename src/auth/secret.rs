//! Secret wrapper that keeps tokens, passwords, and keys out of logs.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Compares against a presented value without short-circuiting on the first mismatch.
	pub fn matches(&self, presented: &str) -> bool {
		constant_time_eq(self.0.as_bytes(), presented.as_bytes())
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Byte equality whose running time depends only on the input lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}

	a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn matches_requires_exact_bytes() {
		let secret = TokenSecret::new("abc123");

		assert!(secret.matches("abc123"));
		assert!(!secret.matches("abc124"));
		assert!(!secret.matches("abc1234"));
		assert!(!secret.matches(""));
	}

	#[test]
	fn secrets_deserialize_from_plain_strings() {
		let secret: TokenSecret =
			serde_json::from_str("\"hunter2\"").expect("Secret should deserialize.");

		assert_eq!(secret.expose(), "hunter2");
	}
}
