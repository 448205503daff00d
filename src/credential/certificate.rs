//! X.509 certificate credential: a signing key handle paired with its public certificate.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey};
use sha2::{Digest, Sha256};
use x509_parser::{parse_x509_certificate, pem::parse_x509_pem, public_key::PublicKey};
// self
use crate::{
	_prelude::*,
	credential::{KeyHandle, KeyProvider, PemSigningKey, SigningError, SigningKey},
};

/// Failures raised while reading the public certificate.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CertificateError {
	/// No certificate bytes were supplied.
	#[error("Certificate is empty.")]
	Empty,
	/// PEM armor could not be decoded or holds something other than a certificate.
	#[error("Certificate PEM cannot be decoded: {reason}.")]
	Pem {
		/// Decoder-supplied reason.
		reason: String,
	},
	/// DER bytes are not a valid X.509 certificate.
	#[error("Certificate DER cannot be parsed: {reason}.")]
	Der {
		/// Parser-supplied reason.
		reason: String,
	},
	/// Certificate key is neither RSA nor EC.
	#[error("Certificate public key algorithm `{oid}` is not supported.")]
	UnsupportedKey {
		/// Dotted OID of the key algorithm.
		oid: String,
	},
	/// Key provider could not return the certificate.
	#[error("Key provider failed to return the certificate: {reason}.")]
	Provider {
		/// Provider-supplied reason.
		reason: String,
	},
}

/// Private key handle plus the DER-encoded X.509 certificate registered with the
/// authority.
///
/// Cloning is cheap; clones share the key handle.
#[derive(Clone)]
pub struct CertificateCredential {
	key: KeyHandle,
	certificate_der: Arc<[u8]>,
	send_x5c: bool,
}
impl CertificateCredential {
	/// Pairs a key handle with a DER certificate.
	pub fn new(key: KeyHandle, certificate_der: impl Into<Vec<u8>>) -> Self {
		Self { key, certificate_der: Arc::from(certificate_der.into()), send_x5c: false }
	}

	/// Loads an in-memory key and a PEM certificate.
	pub fn from_pem(key_pem: &[u8], certificate_pem: &[u8], algorithm: Algorithm) -> Result<Self> {
		let key = PemSigningKey::from_pem(key_pem, algorithm)?;
		let certificate_der = certificate_der_from_pem(certificate_pem)?;

		Ok(Self::new(KeyHandle::new(key), certificate_der))
	}

	/// Resolves both halves of the credential from a [`KeyProvider`].
	pub fn from_key_provider(provider: &dyn KeyProvider, alias: &str) -> Result<Self> {
		let key = provider
			.private_key(alias)
			.map_err(|e| SigningError::InvalidKey { reason: e.to_string() })?;
		let certificate_der = provider
			.public_certificate(alias)
			.map_err(|e| CertificateError::Provider { reason: e.to_string() })?;

		Ok(Self::new(key, certificate_der))
	}

	/// Includes the certificate chain (`x5c`) in assertion headers, enabling
	/// subject-name/issuer authentication.
	pub fn with_x5c(mut self, send_x5c: bool) -> Self {
		self.send_x5c = send_x5c;

		self
	}

	/// Key used to sign assertions.
	pub fn key(&self) -> &dyn SigningKey {
		self.key.key()
	}

	/// Handle shared by every credential signing with this key.
	pub fn key_handle(&self) -> &KeyHandle {
		&self.key
	}

	/// DER bytes of the certificate.
	pub fn certificate_der(&self) -> &[u8] {
		&self.certificate_der
	}

	/// Whether assertions carry the `x5c` header.
	pub fn sends_x5c(&self) -> bool {
		self.send_x5c
	}

	/// Base64url SHA-256 thumbprint of the certificate (`x5t#S256`).
	pub fn thumbprint_sha256(&self) -> String {
		URL_SAFE_NO_PAD.encode(Sha256::digest(&self.certificate_der))
	}

	/// Parses the certificate, failing on malformed DER or unsupported key types.
	pub fn validate(&self) -> Result<(), CertificateError> {
		self.verifying_key().map(|_| ())
	}

	pub(crate) fn verifying_key(&self) -> Result<DecodingKey, CertificateError> {
		if self.certificate_der.is_empty() {
			return Err(CertificateError::Empty);
		}

		let (_, certificate) = parse_x509_certificate(&self.certificate_der)
			.map_err(|e| CertificateError::Der { reason: e.to_string() })?;
		let spki = certificate.public_key();
		let raw: &[u8] = &spki.subject_public_key.data;

		match spki.parsed() {
			Ok(PublicKey::RSA(_)) => Ok(DecodingKey::from_rsa_der(raw)),
			Ok(PublicKey::EC(_)) => Ok(DecodingKey::from_ec_der(raw)),
			_ => Err(CertificateError::UnsupportedKey {
				oid: spki.algorithm.algorithm.to_id_string(),
			}),
		}
	}

	pub(crate) fn sign(&self, message: &[u8]) -> Result<String, SigningError> {
		self.key.sign(message)
	}
}
impl Debug for CertificateCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CertificateCredential")
			.field("algorithm", &self.key.algorithm())
			.field("thumbprint", &self.thumbprint_sha256())
			.field("send_x5c", &self.send_x5c)
			.finish()
	}
}

/// Decodes the first `CERTIFICATE` block of a PEM document into DER.
pub fn certificate_der_from_pem(pem: &[u8]) -> Result<Vec<u8>, CertificateError> {
	if pem.is_empty() {
		return Err(CertificateError::Empty);
	}

	let (_, block) = parse_x509_pem(pem).map_err(|e| CertificateError::Pem { reason: e.to_string() })?;

	if block.label != "CERTIFICATE" {
		return Err(CertificateError::Pem { reason: format!("unexpected `{}` block", block.label) });
	}

	Ok(block.contents)
}
