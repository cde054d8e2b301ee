//! Identifiers, device bindings, secrets, digests, and access-token signing.

pub mod claims;
pub mod device;
pub mod digest;
pub mod id;
pub mod keys;
pub mod secret;
pub mod signer;

pub use claims::*;
pub use device::*;
pub use digest::*;
pub use id::*;
pub use keys::*;
pub use secret::*;
pub use signer::*;
