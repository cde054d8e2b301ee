//! Password grant with brute-force lockout.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	events::{self, AuditEvent},
	flows::{GrantContext, TokenBroker, TokenRequest, TokenResult},
	member::MemberStatus,
	obs,
};

impl TokenBroker {
	/// Blocked members are rejected before the password is checked. Unknown emails count
	/// failures like known ones, and reaching the threshold blocks the member until the status
	/// is reset externally.
	pub(super) async fn password_grant(
		&self,
		ctx: &GrantContext,
		request: TokenRequest,
	) -> Result<TokenResult> {
		let email = request.username.as_deref().map(str::trim).unwrap_or_default().to_owned();
		let password = request.password.as_ref().map(TokenSecret::expose).unwrap_or_default();
		let member = self.members.find_by_email(&email).await?;

		// Known members are locked by status alone; the counter only gates unknown emails.
		let blocked = match &member {
			Some(member) => member.status == MemberStatus::Blocked,
			None => self.attempts.count(&email).await? >= self.config.lockout_threshold,
		};

		if blocked {
			return Err(Error::AccountBlocked);
		}

		let member = match member {
			Some(member) if member.verify_password(password) => member,
			member => {
				let outcome = self.attempts.record_failure(&email).await?;

				if !outcome.locked {
					return Err(Error::InvalidCredentials);
				}
				if let Some(member) = member {
					self.members.update_blocked_member(&member.id).await?;

					obs::log_lockout(&member.id);
					obs::record_lockout();

					let publisher = self.publisher.clone();
					let audit = AuditEvent::new(
						"lockout",
						Some(member.id),
						format!("blocked after {} failed password attempts", outcome.count),
					);

					events::spawn_detached("audit", async move { publisher.publish_audit(audit).await });
				}

				return Err(Error::AccountBlocked);
			},
		};

		self.attempts.reset(&email).await?;
		self.complete_login(ctx, request, member, false, false).await
	}
}
