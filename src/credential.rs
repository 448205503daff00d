//! Client credential material: secrets, certificates, and pre-built assertions.

pub mod certificate;
pub mod key;
pub mod provider;

pub use certificate::*;
pub use key::*;
pub use provider::*;

// self
use crate::{_prelude::*, auth::SecretString, credential::key::KeyFamily, error::ConfigError};

/// `client_assertion_type` value for JWT bearer client authentication (RFC 7523).
pub const JWT_BEARER_ASSERTION_TYPE: &str =
	"urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// The one way a confidential client proves its identity to the authority.
#[derive(Clone)]
pub enum CredentialMaterial {
	/// Shared client secret.
	Secret(SecretString),
	/// Certificate + private key; a fresh signed assertion is built per request.
	Certificate(CertificateCredential),
	/// Caller-supplied client assertion JWT, sent unmodified.
	PrebuiltAssertion(SecretString),
}
impl CredentialMaterial {
	/// Wraps a non-empty client secret.
	pub fn secret(value: impl Into<String>) -> Result<Self, ConfigError> {
		let secret = SecretString::new(value);

		if secret.is_empty() {
			return Err(ConfigError::EmptyClientSecret);
		}

		Ok(Self::Secret(secret))
	}

	/// Wraps a certificate credential.
	pub fn certificate(credential: CertificateCredential) -> Self {
		Self::Certificate(credential)
	}

	/// Wraps a non-empty, caller-built client assertion.
	pub fn prebuilt_assertion(jwt: impl Into<String>) -> Result<Self, ConfigError> {
		let assertion = SecretString::new(jwt);

		if assertion.is_empty() {
			return Err(ConfigError::EmptyClientAssertion);
		}

		Ok(Self::PrebuiltAssertion(assertion))
	}

	/// Variant label.
	pub fn kind(&self) -> CredentialKind {
		match self {
			Self::Secret(_) => CredentialKind::Secret,
			Self::Certificate(_) => CredentialKind::Certificate,
			Self::PrebuiltAssertion(_) => CredentialKind::PrebuiltAssertion,
		}
	}

	/// Checks everything that can be checked without signing or network I/O.
	pub fn validate(&self) -> Result<()> {
		match self {
			Self::Secret(secret) if secret.is_empty() => Err(ConfigError::EmptyClientSecret.into()),
			Self::PrebuiltAssertion(jwt) if jwt.is_empty() =>
				Err(ConfigError::EmptyClientAssertion.into()),
			Self::Certificate(credential) => {
				KeyFamily::of(credential.key().algorithm())?;
				credential.validate()?;

				Ok(())
			},
			_ => Ok(()),
		}
	}
}
impl Debug for CredentialMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Secret(secret) => f.debug_tuple("Secret").field(secret).finish(),
			Self::Certificate(credential) => f.debug_tuple("Certificate").field(credential).finish(),
			Self::PrebuiltAssertion(jwt) => f.debug_tuple("PrebuiltAssertion").field(jwt).finish(),
		}
	}
}

/// Credential variant labels used in spans and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
	/// [`CredentialMaterial::Secret`].
	Secret,
	/// [`CredentialMaterial::Certificate`].
	Certificate,
	/// [`CredentialMaterial::PrebuiltAssertion`].
	PrebuiltAssertion,
}
impl CredentialKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::Secret => "secret",
			CredentialKind::Certificate => "certificate",
			CredentialKind::PrebuiltAssertion => "assertion",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn empty_inputs_are_rejected() {
		assert!(matches!(CredentialMaterial::secret(""), Err(ConfigError::EmptyClientSecret)));
		assert!(matches!(
			CredentialMaterial::prebuilt_assertion(""),
			Err(ConfigError::EmptyClientAssertion)
		));
	}

	#[test]
	fn debug_redacts_secrets() {
		let secret = CredentialMaterial::secret("hunter2").expect("Secret should be accepted.");
		let assertion =
			CredentialMaterial::prebuilt_assertion("eyJ.payload.sig").expect("JWT should be accepted.");

		assert_eq!(format!("{secret:?}"), "Secret(SecretString(\"<redacted>\"))");
		assert!(!format!("{assertion:?}").contains("eyJ"));
		assert_eq!(secret.kind(), CredentialKind::Secret);
		assert_eq!(assertion.kind().as_str(), "assertion");
	}

	#[test]
	fn certificate_validation_parses_certificate() {
		let valid = CredentialMaterial::certificate(rsa_certificate_fixture());

		assert!(valid.validate().is_ok());

		let key = PemSigningKey::from_pem(&fixture("client.key.pem"), jsonwebtoken::Algorithm::RS256)
			.expect("RSA fixture should load.");
		let broken = CredentialMaterial::certificate(CertificateCredential::new(KeyHandle::new(key), Vec::new()));

		assert!(matches!(broken.validate(), Err(Error::InvalidCertificate(CertificateError::Empty))));
	}
}
