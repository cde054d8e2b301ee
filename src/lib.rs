//! Token issuance and federation orchestrator for member platforms.
//!
//! Grants are dispatched through [`flows::TokenBroker`], which signs claims, enforces the
//! password lockout, gates logins behind MFA challenges, and rotates cache-backed sessions.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod flows;
#[cfg(feature = "reqwest")] pub mod http;
pub mod identity;
pub mod member;
pub mod messages;
pub mod mfa;
pub mod obs;
pub mod provider;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
