//! Localized user-facing messages attached to broker errors and outcomes.

// self
use crate::_prelude::*;

/// Language of the user-facing message catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	/// English.
	#[default]
	En,
	/// Bahasa Indonesia.
	Id,
}
impl Language {
	/// Parses a caller-supplied language tag, falling back to English.
	///
	/// Region suffixes are ignored, so `id-ID` and `en_US` resolve to their base language.
	pub fn from_tag(tag: Option<&str>) -> Self {
		let Some(tag) = tag else { return Self::En };
		let base = tag.split(['-', '_']).next().unwrap_or_default();

		if base.eq_ignore_ascii_case("id") { Self::Id } else { Self::En }
	}
}

/// Catalog entries surfaced to end users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Message {
	/// Request failed validation.
	InvalidRequest,
	/// Grant type unknown.
	UnsupportedGrant,
	/// Username or password mismatch.
	InvalidCredentials,
	/// Refresh token mismatch.
	InvalidRefreshToken,
	/// MFA verification failure.
	InvalidOtp,
	/// Basic-auth client failure.
	InvalidClient,
	/// Access token failed validation.
	InvalidToken,
	/// Token is not the live session.
	SessionExpired,
	/// Member missing.
	MemberNotFound,
	/// Member locked out.
	AccountBlocked,
	/// Member deactivated.
	AccountInactive,
	/// Member not yet activated.
	AccountNotActivated,
	/// Azure authorization code expired.
	AuthorizationCodeExpired,
	/// Identity provider rejected the artifact.
	ProviderRejected,
	/// Internal or upstream failure.
	ServiceUnavailable,
	/// Member must register before a token is issued.
	NeedsRegistration,
	/// Member must complete the MFA challenge.
	MfaRequired,
}
impl Message {
	/// Message text in the requested language.
	pub fn text(self, language: Language) -> &'static str {
		match language {
			Language::En => self.en(),
			Language::Id => self.id(),
		}
	}

	fn en(self) -> &'static str {
		match self {
			Self::InvalidRequest => "The request is invalid.",
			Self::UnsupportedGrant => "The grant type is not supported.",
			Self::InvalidCredentials => "The email or password you entered is incorrect.",
			Self::InvalidRefreshToken => "Your session could not be renewed. Please log in again.",
			Self::InvalidOtp => "The OTP code is invalid.",
			Self::InvalidClient => "Client authentication failed.",
			Self::InvalidToken => "The access token is invalid.",
			Self::SessionExpired => "Your session has expired. Please log in again.",
			Self::MemberNotFound => "Account not found.",
			Self::AccountBlocked =>
				"Your account has been blocked after too many failed attempts. Please reset your password.",
			Self::AccountInactive => "Your account is inactive.",
			Self::AccountNotActivated => "Your account has not been activated yet.",
			Self::AuthorizationCodeExpired =>
				"Your sign-in link has expired. Please sign in with Microsoft again.",
			Self::ProviderRejected => "Sign-in with the identity provider failed.",
			Self::ServiceUnavailable => "The service is temporarily unavailable. Please try again.",
			Self::NeedsRegistration => "Please complete your registration to continue.",
			Self::MfaRequired => "Enter the OTP code from your authenticator app.",
		}
	}

	fn id(self) -> &'static str {
		match self {
			Self::InvalidRequest => "Permintaan tidak valid.",
			Self::UnsupportedGrant => "Tipe grant tidak didukung.",
			Self::InvalidCredentials => "Email atau kata sandi yang Anda masukkan salah.",
			Self::InvalidRefreshToken =>
				"Sesi Anda tidak dapat diperbarui. Silakan masuk kembali.",
			Self::InvalidOtp => "Kode OTP tidak valid.",
			Self::InvalidClient => "Autentikasi klien gagal.",
			Self::InvalidToken => "Token akses tidak valid.",
			Self::SessionExpired => "Sesi Anda telah berakhir. Silakan masuk kembali.",
			Self::MemberNotFound => "Akun tidak ditemukan.",
			Self::AccountBlocked =>
				"Akun Anda diblokir karena terlalu banyak percobaan gagal. Silakan atur ulang kata sandi.",
			Self::AccountInactive => "Akun Anda tidak aktif.",
			Self::AccountNotActivated => "Akun Anda belum diaktifkan.",
			Self::AuthorizationCodeExpired =>
				"Tautan masuk Anda telah kedaluwarsa. Silakan masuk dengan Microsoft kembali.",
			Self::ProviderRejected => "Masuk melalui penyedia identitas gagal.",
			Self::ServiceUnavailable => "Layanan sedang tidak tersedia. Silakan coba lagi.",
			Self::NeedsRegistration => "Silakan lengkapi pendaftaran Anda untuk melanjutkan.",
			Self::MfaRequired => "Masukkan kode OTP dari aplikasi autentikator Anda.",
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn language_tags_resolve_to_base_language() {
		assert_eq!(Language::from_tag(Some("id")), Language::Id);
		assert_eq!(Language::from_tag(Some("ID-id")), Language::Id);
		assert_eq!(Language::from_tag(Some("en_US")), Language::En);
		assert_eq!(Language::from_tag(Some("fr")), Language::En);
		assert_eq!(Language::from_tag(None), Language::En);
	}

	#[test]
	fn every_entry_is_translated() {
		let entries = [
			Message::InvalidRequest,
			Message::UnsupportedGrant,
			Message::InvalidCredentials,
			Message::InvalidRefreshToken,
			Message::InvalidOtp,
			Message::InvalidClient,
			Message::InvalidToken,
			Message::SessionExpired,
			Message::MemberNotFound,
			Message::AccountBlocked,
			Message::AccountInactive,
			Message::AccountNotActivated,
			Message::AuthorizationCodeExpired,
			Message::ProviderRejected,
			Message::ServiceUnavailable,
			Message::NeedsRegistration,
			Message::MfaRequired,
		];

		for entry in entries {
			assert_ne!(entry.text(Language::En), entry.text(Language::Id), "{entry:?}");
		}
	}
}
