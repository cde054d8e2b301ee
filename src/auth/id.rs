//! Strongly typed identifiers that end up inside cache keys and token claims.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
// Cache backends scan keys with glob patterns.
const PATTERN_CHARS: [char; 4] = ['*', '?', '[', ']'];

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (member, device, client).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (member, device, client).
		kind: &'static str,
	},
	/// The identifier contains a key-pattern metacharacter.
	#[error("{kind} identifier contains the reserved character `{found}`.")]
	ReservedCharacter {
		/// Kind of identifier (member, device, client).
		kind: &'static str,
		/// Offending character.
		found: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (member, device, client).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { MemberId, "Identifier of a local member record; the `sub` claim of issued tokens.", "Member" }
def_id! { DeviceId, "Caller-supplied identifier of the device a session is bound to.", "Device" }
def_id! { ClientId, "Identifier of a basic-auth API client.", "Client" }

impl MemberId {
	/// Subject stamped on tokens issued to unauthenticated devices.
	pub const ANONYMOUS: &'static str = "anonymous";

	/// Subject used for anonymous tokens.
	pub fn anonymous() -> Self {
		Self(Self::ANONYMOUS.to_owned())
	}

	/// Whether this is the anonymous subject.
	pub fn is_anonymous(&self) -> bool {
		self.0 == Self::ANONYMOUS
	}

	/// Generates a fresh random member identifier.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().simple().to_string())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if let Some(found) = view.chars().find(|c| PATTERN_CHARS.contains(c)) {
		return Err(IdentifierError::ReservedCharacter { kind, found });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
