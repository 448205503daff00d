//! Signing key handles used for client assertions.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, crypto};
// self
use crate::_prelude::*;

/// Failures raised while preparing or signing a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SigningError {
	/// Algorithm is not an asymmetric JWS algorithm accepted for client assertions.
	#[error("Signing algorithm {algorithm:?} is not supported for client assertions.")]
	UnsupportedAlgorithm {
		/// Rejected algorithm.
		algorithm: Algorithm,
	},
	/// Private key material cannot be loaded.
	#[error("Private key is unusable: {reason}.")]
	InvalidKey {
		/// Loader-supplied reason.
		reason: String,
	},
	/// Signature does not verify against the certificate's public key.
	#[error("Private key does not match the certificate public key.")]
	KeyMismatch,
	/// Key handle failed to produce a signature.
	#[error("Signing failed: {reason}.")]
	Failed {
		/// Signer-supplied reason.
		reason: String,
	},
}

/// Handle to a private key able to sign JWS payloads.
///
/// Implementations may wrap in-memory keys, HSMs, or platform key stores. The key
/// material itself never needs to leave the handle.
pub trait SigningKey
where
	Self: Send + Sync,
{
	/// JWS algorithm the key signs with.
	fn algorithm(&self) -> Algorithm;

	/// Signs `message` and returns the base64url (no padding) signature.
	fn sign(&self, message: &[u8]) -> Result<String, SigningError>;

	/// Whether [`sign`](Self::sign) may run concurrently on the same key.
	///
	/// Keys returning `false` are serialized by their [`KeyHandle`].
	fn supports_concurrent_signing(&self) -> bool {
		false
	}
}

/// Owned signing key plus the lock serializing it.
///
/// The handle takes ownership of the key, so every credential signing with it goes
/// through the same lock; clones share both.
#[derive(Clone)]
pub struct KeyHandle {
	key: Arc<dyn SigningKey>,
	signing_lock: Arc<Mutex<()>>,
}
impl KeyHandle {
	/// Wraps `key` in a new handle.
	pub fn new<K>(key: K) -> Self
	where
		K: 'static + SigningKey,
	{
		Self { key: Arc::new(key), signing_lock: Arc::new(Mutex::new(())) }
	}

	/// Underlying key.
	pub fn key(&self) -> &dyn SigningKey {
		self.key.as_ref()
	}

	/// JWS algorithm of the underlying key.
	pub fn algorithm(&self) -> Algorithm {
		self.key.algorithm()
	}

	/// Signs `message`, holding the handle's lock unless the key signs concurrently.
	pub fn sign(&self, message: &[u8]) -> Result<String, SigningError> {
		if self.key.supports_concurrent_signing() {
			return self.key.sign(message);
		}

		let _serialized = self.signing_lock.lock();

		self.key.sign(message)
	}
}
impl Debug for KeyHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyHandle").field("algorithm", &self.algorithm()).finish()
	}
}

/// In-memory RSA or EC private key loaded from PEM or DER.
#[derive(Clone)]
pub struct PemSigningKey {
	key: EncodingKey,
	algorithm: Algorithm,
}
impl PemSigningKey {
	/// Loads a PEM key: PKCS#1 or PKCS#8 for RSA, PKCS#8 for EC.
	pub fn from_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self, SigningError> {
		let key = match KeyFamily::of(algorithm)? {
			KeyFamily::Rsa => EncodingKey::from_rsa_pem(pem),
			KeyFamily::Ec => EncodingKey::from_ec_pem(pem),
		}
		.map_err(|e| SigningError::InvalidKey { reason: e.to_string() })?;

		Ok(Self { key, algorithm })
	}

	/// Loads a DER key: PKCS#1 for RSA, PKCS#8 for EC.
	pub fn from_der(der: &[u8], algorithm: Algorithm) -> Result<Self, SigningError> {
		if der.is_empty() {
			return Err(SigningError::InvalidKey { reason: "empty DER input".into() });
		}

		let key = match KeyFamily::of(algorithm)? {
			KeyFamily::Rsa => EncodingKey::from_rsa_der(der),
			KeyFamily::Ec => EncodingKey::from_ec_der(der),
		};

		Ok(Self { key, algorithm })
	}
}
impl SigningKey for PemSigningKey {
	fn algorithm(&self) -> Algorithm {
		self.algorithm
	}

	fn sign(&self, message: &[u8]) -> Result<String, SigningError> {
		crypto::sign(message, &self.key, self.algorithm)
			.map_err(|e| SigningError::Failed { reason: e.to_string() })
	}

	fn supports_concurrent_signing(&self) -> bool {
		true
	}
}
impl Debug for PemSigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PemSigningKey")
			.field("algorithm", &self.algorithm)
			.field("key", &"<redacted>")
			.finish()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyFamily {
	Rsa,
	Ec,
}
impl KeyFamily {
	pub(crate) fn of(algorithm: Algorithm) -> Result<Self, SigningError> {
		match algorithm {
			Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512 => Ok(Self::Rsa),
			Algorithm::ES256 | Algorithm::ES384 => Ok(Self::Ec),
			algorithm => Err(SigningError::UnsupportedAlgorithm { algorithm }),
		}
	}
}
