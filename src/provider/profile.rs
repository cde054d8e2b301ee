//! Provider profile payloads, one variant per provider family.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, provider::Provider};

/// Profile returned by a gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderProfile {
	/// Microsoft Graph `/me`.
	Azure(AzureProfile),
	/// Google userinfo or tokeninfo.
	Google(GoogleProfile),
	/// Facebook Graph `/me`.
	Facebook(FacebookProfile),
	/// Apple ID token claims.
	Apple(AppleProfile),
	/// Directory bind bridge.
	Ldap(LdapProfile),
}
impl ProviderProfile {
	/// Whether the profile may be reconciled for a grant against `provider`.
	pub fn serves(&self, provider: Provider) -> bool {
		matches!(
			(self, provider),
			(Self::Azure(_), Provider::Azure)
				| (Self::Google(_), Provider::Google | Provider::GoogleOneTap)
				| (Self::Facebook(_), Provider::Facebook)
				| (Self::Apple(_), Provider::Apple)
				| (Self::Ldap(_), Provider::Ldap)
		)
	}

	/// Provider-side subject identifier.
	pub fn subject(&self) -> &str {
		match self {
			Self::Azure(p) => &p.id,
			Self::Google(p) => &p.sub,
			Self::Facebook(p) => &p.id,
			Self::Apple(p) => &p.sub,
			Self::Ldap(p) => &p.username,
		}
	}

	/// Email address, when the provider exposes a usable one.
	pub fn email(&self) -> Option<&str> {
		let email = match self {
			Self::Azure(p) => p.mail.as_deref().or_else(|| {
				p.user_principal_name.as_deref().filter(|upn| upn.contains('@'))
			}),
			Self::Google(p) => p.email.as_deref(),
			Self::Facebook(p) => p.email.as_deref(),
			Self::Apple(p) => p.email.as_deref(),
			Self::Ldap(p) => p.email.as_deref(),
		};

		email.map(str::trim).filter(|e| !e.is_empty())
	}

	/// Given and family name, falling back to splitting the display name.
	pub fn names(&self) -> (String, String) {
		let (given, family, display) = match self {
			Self::Azure(p) => (&p.given_name, &p.surname, &p.display_name),
			Self::Google(p) => (&p.given_name, &p.family_name, &p.name),
			Self::Facebook(p) => (&p.first_name, &p.last_name, &p.name),
			Self::Apple(p) => (&p.first_name, &p.last_name, &None),
			Self::Ldap(p) => (&p.first_name, &p.last_name, &p.display_name),
		};
		let given = given.as_deref().map(str::trim).unwrap_or_default();
		let family = family.as_deref().map(str::trim).unwrap_or_default();

		if given.is_empty() && family.is_empty() {
			split_name(display.as_deref().unwrap_or_default())
		} else {
			(given.to_owned(), family.to_owned())
		}
	}

	/// Mobile number, when exposed.
	pub fn mobile(&self) -> Option<&str> {
		match self {
			Self::Azure(p) => p.mobile_phone.as_deref(),
			Self::Ldap(p) => p.mobile.as_deref(),
			_ => None,
		}
	}
}

/// Microsoft Graph `/me` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProfile {
	/// Directory object id.
	pub id: String,
	/// Display name.
	#[serde(default)]
	pub display_name: Option<String>,
	/// Given name.
	#[serde(default)]
	pub given_name: Option<String>,
	/// Surname.
	#[serde(default)]
	pub surname: Option<String>,
	/// Primary mail address.
	#[serde(default)]
	pub mail: Option<String>,
	/// User principal name.
	#[serde(default)]
	pub user_principal_name: Option<String>,
	/// Mobile phone.
	#[serde(default)]
	pub mobile_phone: Option<String>,
}

/// Google userinfo/tokeninfo payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleProfile {
	/// Google subject.
	pub sub: String,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Whether Google verified the address; tokeninfo encodes it as a string.
	#[serde(default, deserialize_with = "flexible_bool")]
	pub email_verified: bool,
	/// Full name.
	#[serde(default)]
	pub name: Option<String>,
	/// Given name.
	#[serde(default)]
	pub given_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub family_name: Option<String>,
	/// Audience of the ID token (tokeninfo only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<String>,
}

/// Facebook Graph `/me` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacebookProfile {
	/// App-scoped user id.
	pub id: String,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Full name.
	#[serde(default)]
	pub name: Option<String>,
	/// First name.
	#[serde(default)]
	pub first_name: Option<String>,
	/// Last name.
	#[serde(default)]
	pub last_name: Option<String>,
}

/// Apple ID token claims; names come from the first-login request, not the token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleProfile {
	/// Apple subject.
	pub sub: String,
	/// Email address (possibly a private relay address).
	#[serde(default)]
	pub email: Option<String>,
	/// Whether Apple verified the address.
	#[serde(default, deserialize_with = "flexible_bool")]
	pub email_verified: bool,
	/// Given name supplied by the client.
	#[serde(default)]
	pub first_name: Option<String>,
	/// Family name supplied by the client.
	#[serde(default)]
	pub last_name: Option<String>,
}

/// Directory bind bridge payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapProfile {
	/// Directory account name.
	pub username: String,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Display name.
	#[serde(default)]
	pub display_name: Option<String>,
	/// Given name.
	#[serde(default)]
	pub first_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub last_name: Option<String>,
	/// Mobile phone.
	#[serde(default)]
	pub mobile: Option<String>,
}

/// Splits a display name into given name and the remainder.
pub fn split_name(full: &str) -> (String, String) {
	let mut parts = full.split_whitespace();
	let given = parts.next().unwrap_or_default().to_owned();
	let family = parts.collect::<Vec<_>>().join(" ");

	(given, family)
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Flexible {
		Bool(bool),
		Text(String),
	}

	Ok(match Flexible::deserialize(deserializer)? {
		Flexible::Bool(b) => b,
		Flexible::Text(s) => s.eq_ignore_ascii_case("true"),
	})
}
