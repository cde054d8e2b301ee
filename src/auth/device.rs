//! Device and login-surface binding carried by sessions and tokens.

// self
use crate::{_prelude::*, auth::DeviceId};

/// Login surface a session was opened from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceLogin {
	/// Browser session.
	Web,
	/// Native mobile application.
	Mobile,
	/// Partner or first-party app integration.
	Apps,
}
impl DeviceLogin {
	/// Stable upper-case label used in keys and claims.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Web => "WEB",
			Self::Mobile => "MOBILE",
			Self::Apps => "APPS",
		}
	}
}
impl Display for DeviceLogin {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for DeviceLogin {
	type Err = UnknownDeviceLogin;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"WEB" => Ok(Self::Web),
			"MOBILE" => Ok(Self::Mobile),
			"APPS" => Ok(Self::Apps),
			_ => Err(UnknownDeviceLogin(s.to_owned())),
		}
	}
}

/// Error returned for a login surface outside WEB, MOBILE, or APPS.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Device login `{0}` must be one of WEB, MOBILE, or APPS.")]
pub struct UnknownDeviceLogin(pub String);

/// The `(deviceId, deviceLogin)` pair every session, refresh token, and challenge is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceBinding {
	/// Device identifier.
	pub device_id: DeviceId,
	/// Login surface.
	pub device_login: DeviceLogin,
}
impl DeviceBinding {
	/// Creates a new binding.
	pub fn new(device_id: DeviceId, device_login: DeviceLogin) -> Self {
		Self { device_id, device_login }
	}
}
