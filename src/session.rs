//! Cache-backed session lifecycle: live sessions, refresh tokens, and login attempts.

pub mod attempts;
pub mod login;
pub mod refresh;

pub use attempts::*;
pub use login::*;
pub use refresh::*;
