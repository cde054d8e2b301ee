//! Provider strategy hooks that classify failed provider calls.
//!
//! Gateways collect the status code and error fields of a failed response into a
//! [`ProviderErrorContext`]; a strategy turns it into a [`ProviderErrorKind`] without
//! depending on any HTTP client.

// self
use crate::{_prelude::*, error::UpstreamError, provider::Provider};

/// Strategy hook that classifies provider failures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed provider response into the broker taxonomy.
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the artifact (bad code, token, or directory credentials).
	Rejected,
	/// Authorization code expired or was already redeemed.
	CodeExpired,
	/// Client authentication failed.
	InvalidClient,
	/// Failure is temporary or unexplained.
	Transient,
}

/// Context passed to provider strategies when classifying failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Provider that answered.
	pub provider: Provider,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied `error` field (or Graph `error.code`).
	pub error_code: Option<String>,
	/// Provider-supplied `error_description` field (or Graph `error.message`).
	pub error_description: Option<String>,
	/// Preview of the response body.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provider.
	pub fn new(provider: Provider) -> Self {
		Self { provider, http_status: None, error_code: None, error_description: None, body_preview: None }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the provider error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}

	/// Adds the provider error description.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, extracting `error` fields when the body is JSON.
	///
	/// Understands the OAuth shape (`error`, `error_description`) and the Graph shape
	/// (`error.code`, `error.message`).
	pub fn with_body(mut self, body: &str) -> Self {
		if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
			let (code, description) = match value.get("error") {
				Some(serde_json::Value::Object(inner)) => (
					inner.get("code").or_else(|| inner.get("type")),
					inner.get("message"),
				),
				Some(code) => (Some(code), value.get("error_description")),
				None => (None, value.get("error_description")),
			};

			if let Some(code) = code.and_then(value_text) {
				self.error_code = Some(code);
			}
			if let Some(description) = description.and_then(value_text) {
				self.error_description = Some(description);
			}
		}

		self.body_preview = Some(truncate_preview(body));

		self
	}

	/// Short human-readable reason for error messages.
	pub fn reason(&self) -> String {
		self.error_description
			.clone()
			.or_else(|| self.error_code.clone())
			.or_else(|| self.http_status.map(|s| format!("HTTP {s}")))
			.unwrap_or_else(|| "no details".into())
	}

	/// Converts the classified context into an [`UpstreamError`].
	pub fn into_error(self, kind: ProviderErrorKind) -> UpstreamError {
		let provider = self.provider;

		match kind {
			ProviderErrorKind::Rejected => UpstreamError::Rejected { provider, reason: self.reason() },
			ProviderErrorKind::CodeExpired => UpstreamError::AuthorizationCodeExpired { provider },
			ProviderErrorKind::InvalidClient =>
				UpstreamError::MisconfiguredClient { provider, reason: self.reason() },
			ProviderErrorKind::Transient => UpstreamError::Unavailable {
				provider,
				message: self.reason(),
				status: self.http_status,
			},
		}
	}
}

/// Default strategy applying OAuth heuristics.
///
/// It prioritizes structured fields (`error`, `error_description`), then body text hints,
/// and finally the HTTP status code.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if let Some(kind) = classify_fields(ctx.error_code.as_deref(), ctx.error_description.as_deref())
		{
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

/// Azure AD strategy recognizing `AADSTS` codes for expired or redeemed authorization codes.
#[derive(Debug, Default)]
pub struct AzureStrategy;
impl AzureStrategy {
	const EXPIRED_CODES: [&'static str; 2] = ["AADSTS70008", "AADSTS54005"];
}
impl ProviderStrategy for AzureStrategy {
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		let expired = [ctx.error_description.as_deref(), ctx.body_preview.as_deref()]
			.into_iter()
			.flatten()
			.any(|text| Self::EXPIRED_CODES.iter().any(|code| text.contains(code)));

		if expired {
			return ProviderErrorKind::CodeExpired;
		}

		DefaultProviderStrategy.classify(ctx)
	}
}

/// Directory-bridge strategy: authentication statuses mean bad member credentials.
#[derive(Debug, Default)]
pub struct DirectoryStrategy;
impl ProviderStrategy for DirectoryStrategy {
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		match ctx.http_status {
			Some(400 | 401 | 403 | 404) => ProviderErrorKind::Rejected,
			_ => DefaultProviderStrategy.classify(ctx),
		}
	}
}

fn value_text(value: &serde_json::Value) -> Option<String> {
	match value {
		serde_json::Value::String(s) => Some(s.clone()),
		serde_json::Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(ProviderErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn classify_fields(code: Option<&str>, description: Option<&str>) -> Option<ProviderErrorKind> {
	code.and_then(match_exact_value)
		.or_else(|| description.and_then(match_exact_value))
		.or_else(|| classify_body(description))
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant")
		|| value.eq_ignore_ascii_case("access_denied")
		|| value.eq_ignore_ascii_case("invalid_token")
		|| value.eq_ignore_ascii_case("OAuthException")
	{
		Some(ProviderErrorKind::Rejected)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(ProviderErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") || text.contains("invalid_token") =>
			Some(ProviderErrorKind::Rejected),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 401 | 403 | 404 | 410) => ProviderErrorKind::Rejected,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn oauth_fields_drive_classification() {
		let ctx = ProviderErrorContext::new(Provider::Google)
			.with_http_status(400)
			.with_body(r#"{"error":"invalid_client","error_description":"Unauthorized"}"#);

		assert_eq!(ctx.error_code.as_deref(), Some("invalid_client"));
		assert_eq!(DefaultProviderStrategy.classify(&ctx), ProviderErrorKind::InvalidClient);
	}

	#[test]
	fn graph_error_shape_is_understood() {
		let ctx = ProviderErrorContext::new(Provider::Facebook).with_http_status(400).with_body(
			r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#,
		);

		assert_eq!(ctx.error_code.as_deref(), Some("190"));
		assert_eq!(ctx.reason(), "Invalid OAuth access token.");
		assert_eq!(DefaultProviderStrategy.classify(&ctx), ProviderErrorKind::Rejected);
	}

	#[test]
	fn azure_expired_codes_are_recognized() {
		let ctx = ProviderErrorContext::new(Provider::Azure).with_http_status(400).with_body(
			r#"{"error":"invalid_grant","error_description":"AADSTS70008: The provided authorization code or refresh token has expired."}"#,
		);

		assert_eq!(AzureStrategy.classify(&ctx), ProviderErrorKind::CodeExpired);
		assert_eq!(DefaultProviderStrategy.classify(&ctx), ProviderErrorKind::Rejected);
		assert!(matches!(
			ctx.into_error(ProviderErrorKind::CodeExpired),
			UpstreamError::AuthorizationCodeExpired { provider: Provider::Azure }
		));
	}

	#[test]
	fn status_fallbacks() {
		let server = ProviderErrorContext::new(Provider::Google).with_http_status(503);
		let directory = ProviderErrorContext::new(Provider::Ldap).with_http_status(401);

		assert_eq!(DefaultProviderStrategy.classify(&server), ProviderErrorKind::Transient);
		assert_eq!(DirectoryStrategy.classify(&directory), ProviderErrorKind::Rejected);
		assert_eq!(DirectoryStrategy.classify(&server), ProviderErrorKind::Transient);
	}

	#[test]
	fn previews_are_truncated() {
		let ctx = ProviderErrorContext::new(Provider::Google).with_body(&"x".repeat(400));
		let preview = ctx.body_preview.expect("Preview should be captured.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
