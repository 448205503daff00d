//! Key provider seam for platform key stores plus a directory-backed implementation.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	credential::{KeyHandle, PemSigningKey, certificate_der_from_pem},
};

/// Errors emitted by [`KeyProvider`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum KeyStoreError {
	/// Alias is unknown to the key store.
	#[error("Key store has no entry for alias `{alias}`.")]
	NotFound {
		/// Requested alias.
		alias: String,
	},
	/// Alias cannot name a key store entry.
	#[error("Key alias `{alias}` is invalid.")]
	InvalidAlias {
		/// Rejected alias.
		alias: String,
	},
	/// Underlying storage failed.
	#[error("Key store backend failure: {message}.")]
	Backend {
		/// Human-readable description.
		message: String,
	},
}

/// Retrieves key handles and certificates from an external key store (OS store, vault,
/// HSM) by alias.
pub trait KeyProvider
where
	Self: Send + Sync,
{
	/// Returns a signing handle for the private key stored under `alias`.
	fn private_key(&self, alias: &str) -> Result<KeyHandle, KeyStoreError>;

	/// Returns the DER-encoded certificate stored under `alias`.
	fn public_certificate(&self, alias: &str) -> Result<Vec<u8>, KeyStoreError>;
}

/// Reads `<alias>.key.pem` and `<alias>.crt.pem` from a directory.
#[derive(Clone, Debug)]
pub struct FileKeyProvider {
	dir: PathBuf,
	algorithm: Algorithm,
}
impl FileKeyProvider {
	/// Creates a provider rooted at `dir`, signing with RS256.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into(), algorithm: Algorithm::RS256 }
	}

	/// Overrides the signing algorithm applied to loaded keys.
	pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
		self.algorithm = algorithm;

		self
	}

	fn entry_path(&self, alias: &str, suffix: &str) -> Result<PathBuf, KeyStoreError> {
		if alias.is_empty() || alias.contains(['/', '\\']) || alias.starts_with('.') {
			return Err(KeyStoreError::InvalidAlias { alias: alias.to_owned() });
		}

		Ok(self.dir.join(format!("{alias}.{suffix}")))
	}

	fn read(path: &Path, alias: &str) -> Result<Vec<u8>, KeyStoreError> {
		if !path.exists() {
			return Err(KeyStoreError::NotFound { alias: alias.to_owned() });
		}

		fs::read(path).map_err(|e| KeyStoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})
	}
}
impl KeyProvider for FileKeyProvider {
	fn private_key(&self, alias: &str) -> Result<KeyHandle, KeyStoreError> {
		let path = self.entry_path(alias, "key.pem")?;
		let pem = Self::read(&path, alias)?;
		let key = PemSigningKey::from_pem(&pem, self.algorithm).map_err(|e| {
			KeyStoreError::Backend { message: format!("Failed to load {}: {e}", path.display()) }
		})?;

		Ok(KeyHandle::new(key))
	}

	fn public_certificate(&self, alias: &str) -> Result<Vec<u8>, KeyStoreError> {
		let path = self.entry_path(alias, "crt.pem")?;
		let pem = Self::read(&path, alias)?;

		certificate_der_from_pem(&pem).map_err(|e| KeyStoreError::Backend {
			message: format!("Failed to decode {}: {e}", path.display()),
		})
	}
}
