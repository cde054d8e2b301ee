//! Token verification, logout, device sessions, and basic-auth clients.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, DeviceBinding, MemberId, TokenSecret},
	events::{self, AuditEvent},
	flows::{TokenBroker, VerifyResponse},
	member::MemberStatus,
};

impl TokenBroker {
	/// Verifies an access token and requires it to be the live session for its device.
	///
	/// Member tokens additionally require the member to exist and not be blocked.
	pub async fn verify_token_member(&self, token: &str) -> Result<VerifyResponse> {
		let claims = self.signer.verify(token)?;
		let subject = claims.subject()?;
		let binding = claims.binding()?;

		if !self.sessions.is_current(&subject, &binding, token).await? {
			return Err(Error::SessionExpired);
		}
		if !subject.is_anonymous() {
			let member = self.members.find_by_id(&subject).await?.ok_or(Error::MemberNotFound)?;

			if member.status == MemberStatus::Blocked {
				return Err(Error::AccountBlocked);
			}
		}

		Ok(VerifyResponse {
			expires_at: claims.expires_at()?,
			member_id: subject,
			email: claims.email,
			member_type: claims.member_type,
			authorised: claims.authorised,
			admin: claims.admin,
			staff: claims.staff,
			binding,
		})
	}

	/// Ends the session the token belongs to and revokes the device's refresh token.
	///
	/// Expired tokens are accepted; a token superseded by a newer login is not.
	pub async fn logout(&self, token: &str) -> Result<()> {
		let claims = self.signer.verify_ignoring_expiration(token)?;
		let subject = claims.subject()?;
		let binding = claims.binding()?;

		if !self.sessions.is_current(&subject, &binding, token).await? {
			return Err(Error::SessionExpired);
		}

		self.end_session(&subject, &binding, "logout").await?;

		Ok(())
	}

	/// Devices holding a live session for the member.
	///
	/// A prefix scan for `m1` also matches keys of `m1-x`; only sessions whose token was issued
	/// to `subject` for that exact device are kept.
	pub async fn list_sessions(&self, subject: &MemberId) -> Result<Vec<DeviceBinding>> {
		let mut owned = Vec::new();

		for binding in self.sessions.list(subject).await? {
			if self.session_owner(subject, &binding).await? == SessionOwner::Subject {
				owned.push(binding);
			}
		}

		Ok(owned)
	}

	/// Ends one device session of the member.
	///
	/// Returns `false` when the device had no live session or the key holds another member's
	/// session.
	pub async fn revoke_session(&self, subject: &MemberId, binding: &DeviceBinding) -> Result<bool> {
		if self.session_owner(subject, binding).await? == SessionOwner::Other {
			return Ok(false);
		}

		self.end_session(subject, binding, "revoke_session").await
	}

	/// Checks basic-auth client credentials against the configured clients.
	pub fn validate_basic_auth(&self, client_id: &str, client_secret: &str) -> Result<ClientId> {
		let secret = self.config.client_secret(client_id).ok_or(Error::InvalidClient)?;

		if !secret.matches(client_secret) {
			return Err(Error::InvalidClient);
		}

		ClientId::new(client_id).map_err(|_| Error::InvalidClient)
	}

	async fn session_owner(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
	) -> Result<SessionOwner> {
		let Some(token) = self.sessions.current(subject, binding).await? else {
			return Ok(SessionOwner::Absent);
		};
		let owned = self.signer.verify_ignoring_expiration(&token).is_ok_and(|claims| {
			claims.sub == subject.as_ref()
				&& claims.device_id == binding.device_id.as_ref()
				&& claims.device_login == binding.device_login
		});

		Ok(if owned { SessionOwner::Subject } else { SessionOwner::Other })
	}

	async fn end_session(
		&self,
		subject: &MemberId,
		binding: &DeviceBinding,
		action: &'static str,
	) -> Result<bool> {
		let removed = self.sessions.remove(subject, binding).await?;

		self.refresh_tokens.revoke(subject, binding).await?;

		if removed && !subject.is_anonymous() {
			let publisher = self.publisher.clone();
			let audit = AuditEvent::new(
				action,
				Some(subject.clone()),
				format!("{}-{}", binding.device_id, binding.device_login),
			);

			events::spawn_detached("audit", async move { publisher.publish_audit(audit).await });
		}

		Ok(removed)
	}
}

/// Who the live session stored under a device key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionOwner {
	Absent,
	Subject,
	Other,
}

/// Splits a `Basic <base64(id:secret)>` header value into client id and secret.
pub fn parse_basic_authorization(header: &str) -> Result<(String, TokenSecret)> {
	let header = header.trim();
	let (scheme, encoded) = header.split_once(' ').ok_or(Error::InvalidClient)?;

	if !scheme.eq_ignore_ascii_case("basic") {
		return Err(Error::InvalidClient);
	}

	let raw = STANDARD.decode(encoded.trim()).map_err(|_| Error::InvalidClient)?;
	let decoded = String::from_utf8(raw).map_err(|_| Error::InvalidClient)?;
	let (client_id, secret) = decoded.split_once(':').ok_or(Error::InvalidClient)?;

	if client_id.is_empty() {
		return Err(Error::InvalidClient);
	}

	Ok((client_id.to_owned(), TokenSecret::new(secret)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_basic_headers() {
		let header = format!("Basic {}", STANDARD.encode("portal:s3cr:et"));
		let (client_id, secret) = parse_basic_authorization(&header).expect("Header should parse.");

		assert_eq!(client_id, "portal");
		assert_eq!(secret.expose(), "s3cr:et");

		let lower = format!("basic {}", STANDARD.encode("portal:x"));

		assert!(parse_basic_authorization(&lower).is_ok());
	}

	#[test]
	fn malformed_headers_are_invalid_client() {
		for header in [
			"Bearer abc".to_owned(),
			"Basic".to_owned(),
			"Basic %%%".to_owned(),
			format!("Basic {}", STANDARD.encode("no-colon")),
			format!("Basic {}", STANDARD.encode(":secret")),
		] {
			assert!(matches!(parse_basic_authorization(&header), Err(Error::InvalidClient)));
		}
	}
}
