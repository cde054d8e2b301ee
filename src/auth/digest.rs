//! Keyed SHA-256 digests used for token identifiers, challenge tokens, and password hashes.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::secret::constant_time_eq};

/// Keyed digest producing lowercase hex of `sha256(key ‖ input)`.
#[derive(Clone)]
pub struct KeyedDigest {
	key: Vec<u8>,
}
impl KeyedDigest {
	/// Creates a digest bound to the provided key.
	pub fn new(key: impl AsRef<[u8]>) -> Self {
		Self { key: key.as_ref().to_vec() }
	}

	/// Hex digest of the keyed input.
	pub fn hex(&self, input: &str) -> String {
		salted_hex(&self.key, input.as_bytes())
	}
}
impl Debug for KeyedDigest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("KeyedDigest(..)")
	}
}

/// Hashes a password with its salt as lowercase hex of `sha256(salt ‖ password)`.
pub fn hash_password(salt: &str, password: &str) -> String {
	salted_hex(salt.as_bytes(), password.as_bytes())
}

/// Verifies a password against the stored hex hash without early exit.
pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
	let computed = hash_password(salt, password);

	constant_time_eq(computed.as_bytes(), stored_hash.to_ascii_lowercase().as_bytes())
}

fn salted_hex(prefix: &[u8], input: &[u8]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(prefix);
	hasher.update(input);

	format!("{:x}", hasher.finalize())
}
