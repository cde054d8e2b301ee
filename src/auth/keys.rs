//! RSA key material for signing and verifying access tokens.

// std
use std::path::Path;
// crates.io
use jsonwebtoken::{DecodingKey, EncodingKey};
// self
use crate::{_prelude::*, error::ConfigError};

/// Active signing key plus every public key still accepted for verification.
///
/// Tokens carry the `kid` of the key that signed them; retired public keys stay verifiable
/// until the tokens they signed expire.
#[derive(Clone)]
pub struct KeyProvider {
	active_kid: String,
	encoding: EncodingKey,
	decoding: HashMap<String, DecodingKey>,
}
impl KeyProvider {
	/// Builds a provider from an RSA private key and its public counterpart, both PEM-encoded.
	pub fn from_rsa_pem(
		kid: impl Into<String>,
		private_pem: &[u8],
		public_pem: &[u8],
	) -> Result<Self, ConfigError> {
		let kid = kid.into();
		let encoding = EncodingKey::from_rsa_pem(private_pem)
			.map_err(|source| ConfigError::InvalidKey { which: "signing", source })?;
		let decoding = DecodingKey::from_rsa_pem(public_pem)
			.map_err(|source| ConfigError::InvalidKey { which: "verification", source })?;

		Ok(Self { decoding: HashMap::from([(kid.clone(), decoding)]), active_kid: kid, encoding })
	}

	/// Reads both PEM files from disk, then delegates to [`KeyProvider::from_rsa_pem`].
	pub fn from_pem_files(
		kid: impl Into<String>,
		private_path: impl AsRef<Path>,
		public_path: impl AsRef<Path>,
	) -> Result<Self, ConfigError> {
		let private_pem = read_key_file(private_path.as_ref())?;
		let public_pem = read_key_file(public_path.as_ref())?;

		Self::from_rsa_pem(kid, &private_pem, &public_pem)
	}

	/// Keeps a retired public key available for verification.
	pub fn with_retired_key(
		mut self,
		kid: impl Into<String>,
		public_pem: &[u8],
	) -> Result<Self, ConfigError> {
		let decoding = DecodingKey::from_rsa_pem(public_pem)
			.map_err(|source| ConfigError::InvalidKey { which: "retired", source })?;

		self.decoding.entry(kid.into()).or_insert(decoding);

		Ok(self)
	}

	/// Identifier stamped in the header of newly signed tokens.
	pub fn active_kid(&self) -> &str {
		&self.active_kid
	}

	/// Private key used for signing.
	pub fn encoding_key(&self) -> &EncodingKey {
		&self.encoding
	}

	/// Public key registered under `kid`.
	pub fn decoding_key(&self, kid: &str) -> Option<&DecodingKey> {
		self.decoding.get(kid)
	}
}
impl Debug for KeyProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut kids = self.decoding.keys().collect::<Vec<_>>();

		kids.sort();

		f.debug_struct("KeyProvider")
			.field("active_kid", &self.active_kid)
			.field("verification_kids", &kids)
			.finish_non_exhaustive()
	}
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
	std::fs::read(path)
		.map_err(|source| ConfigError::KeyFile { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/signing_key.pem");
	const PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/signing_key.pub.pem");
	const FOREIGN_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/foreign_key.pub.pem");

	#[test]
	fn loads_pem_pair() {
		let keys = KeyProvider::from_rsa_pem("k1", PRIVATE, PUBLIC)
			.expect("Fixture key pair should load.");

		assert_eq!(keys.active_kid(), "k1");
		assert!(keys.decoding_key("k1").is_some());
		assert!(keys.decoding_key("k0").is_none());
	}

	#[test]
	fn rejects_garbage_material() {
		let err = KeyProvider::from_rsa_pem("k1", b"not a key", PUBLIC)
			.expect_err("Garbage private key should be rejected.");

		assert!(matches!(err, ConfigError::InvalidKey { which: "signing", .. }));
	}

	#[test]
	fn retired_keys_stay_verifiable_without_replacing_active() {
		let keys = KeyProvider::from_rsa_pem("k2", PRIVATE, PUBLIC)
			.and_then(|k| k.with_retired_key("k1", FOREIGN_PUBLIC))
			.and_then(|k| k.with_retired_key("k2", FOREIGN_PUBLIC))
			.expect("Retired key should load.");

		assert_eq!(keys.active_kid(), "k2");
		assert!(keys.decoding_key("k1").is_some());
		assert!(format!("{keys:?}").contains("\"k1\", \"k2\""));
	}

	#[test]
	fn missing_files_report_path() {
		let err = KeyProvider::from_pem_files("k1", "/nonexistent/key.pem", "/nonexistent/pub.pem")
			.expect_err("Missing key file should fail.");

		assert!(matches!(err, ConfigError::KeyFile { ref path, .. } if path == "/nonexistent/key.pem"));
	}
}
