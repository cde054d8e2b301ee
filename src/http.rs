//! Transport primitives for identity-provider calls.
//!
//! [`FederationHttpClient`] wraps a reqwest client with redirects disabled and funnels every
//! provider response through one path: success bodies are decoded with field-path error
//! reporting, failures are classified by the gateway's [`ProviderStrategy`].

// std
use std::ops::Deref;
// crates.io
use reqwest::{RequestBuilder, redirect::Policy};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError, UpstreamError},
	obs,
	provider::{Provider, ProviderErrorContext, ProviderStrategy},
};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Provider endpoints must answer directly; redirects are never followed.
#[derive(Clone, Debug)]
pub struct FederationHttpClient(pub ReqwestClient);
impl FederationHttpClient {
	/// Builds a client with redirects disabled and a per-request timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout)
			.map_err(|_| ConfigError::NonPositiveDuration { field: "federationTimeout" })?;
		let client = ReqwestClient::builder().redirect(Policy::none()).timeout(timeout).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Sends `request` and decodes a JSON success body.
	pub(crate) async fn send_json<T>(
		&self,
		provider: Provider,
		strategy: &dyn ProviderStrategy,
		request: RequestBuilder,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = request.send().await.map_err(|e| {
			obs::log_upstream_failure(provider.as_str(), &e);

			Error::from(TransportError::from(e))
		})?;
		let status = response.status();
		let body = response.text().await.map_err(TransportError::from)?;

		if !status.is_success() {
			let ctx = ProviderErrorContext::new(provider).with_http_status(status.as_u16()).with_body(&body);
			let kind = strategy.classify(&ctx);
			let err = ctx.into_error(kind);

			obs::log_upstream_failure(provider.as_str(), &err);

			return Err(err.into());
		}

		let mut de = serde_json::Deserializer::from_str(&body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| UpstreamError::MalformedResponse { provider, source }.into())
	}
}
impl AsRef<ReqwestClient> for FederationHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for FederationHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
