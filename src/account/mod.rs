//! Account management.
//!
//! # Data Flow
//! ```text
//! mnemonic / hex secret / secret URI
//!     → keypair.rs (sr25519 derivation, signing)
//!     → ss58.rs (address encoding for the configured network prefix)
//! ```
//!
//! # Security Constraints
//! - Secrets are never logged
//! - Mnemonics are kept only when the account was created from one

pub mod keypair;
pub mod ss58;

pub use keypair::{Account, DEFAULT_WORD_COUNT, SUPPORTED_WORD_COUNTS};
pub use ss58::{is_valid_address, DEFAULT_SS58_FORMAT};
