//! SSH probing, key material, and client configuration

pub mod bootstrap;
pub mod deploy_key;
pub mod handshake;
pub mod public_key;

pub use bootstrap::*;
pub use deploy_key::*;
pub use handshake::*;
pub use public_key::*;
