//! Zeroizing wrapper for token material and OAuth client secrets
//!
//! Access tokens, refresh tokens and client secrets travel through logs,
//! serialized responses and debug output. `SecretString` keeps the raw
//! value out of all three and wipes the memory on drop.

use serde::{Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string whose contents never appear in Debug, Display or serialized
/// output, and which is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
	pub fn new(secret: String) -> Self {
		Self(secret)
	}

	/// Expose the underlying secret. Call sites shrink to the exact place
	/// the value goes on the wire.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString([REDACTED])")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[REDACTED]")
	}
}

impl From<String> for SecretString {
	fn from(secret: String) -> Self {
		Self::new(secret)
	}
}

impl From<&str> for SecretString {
	fn from(secret: &str) -> Self {
		Self::new(secret.to_string())
	}
}

// Serializes as a redacted marker so a credential accidentally embedded in
// an API response or log payload leaks nothing.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("[REDACTED]")
	}
}

// Constant-time comparison; secrets are compared during API-key checks.
impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		let a = self.0.as_bytes();
		let b = other.0.as_bytes();
		if a.len() != b.len() {
			return false;
		}
		let mut diff = 0u8;
		for (x, y) in a.iter().zip(b.iter()) {
			diff |= x ^ y;
		}
		diff == 0
	}
}

impl Eq for SecretString {}
