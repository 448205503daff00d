//! RFC 7523 client assertions signed with a certificate credential.
//!
//! The JWS is assembled by hand so signing can be delegated to any [`SigningKey`]
//! handle; `jsonwebtoken` only contributes the header model and verification
//! primitives. Every assertion is verified against the certificate's public key before
//! it is handed out, which turns a key/certificate mismatch into a local
//! [`SigningError::KeyMismatch`] instead of an opaque `invalid_client` from the
//! authority.
//!
//! [`SigningKey`]: crate::credential::SigningKey

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use jsonwebtoken::{Header, crypto};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, SecretString},
	credential::{CertificateCredential, SigningError, key::KeyFamily},
};

/// Default assertion lifetime.
pub const ASSERTION_LIFETIME: Duration = Duration::minutes(10);

/// Registered claims carried by a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Audience: the token endpoint URL.
	pub aud: String,
	/// Expiry (seconds since epoch).
	pub exp: i64,
	/// Issued-at (seconds since epoch).
	pub iat: i64,
	/// Issuer: the client id.
	pub iss: String,
	/// Unique token identifier.
	pub jti: String,
	/// Not-before (seconds since epoch).
	pub nbf: i64,
	/// Subject: the client id.
	pub sub: String,
}

/// Signed client assertion ready to be sent as `client_assertion`.
#[derive(Clone)]
pub struct ClientAssertion {
	value: SecretString,
	jwt_id: String,
	expires_at: OffsetDateTime,
}
impl ClientAssertion {
	/// Compact JWS serialization. Callers must avoid logging this string.
	pub fn value(&self) -> &str {
		self.value.expose()
	}

	/// `jti` claim.
	pub fn jwt_id(&self) -> &str {
		&self.jwt_id
	}

	/// `exp` claim as an instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	pub(crate) fn into_secret(self) -> SecretString {
		self.value
	}
}
impl Debug for ClientAssertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientAssertion")
			.field("value", &self.value)
			.field("jwt_id", &self.jwt_id)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Stateless builder producing one fresh assertion per call.
#[derive(Clone, Copy, Debug)]
pub struct AssertionBuilder {
	lifetime: Duration,
}
impl AssertionBuilder {
	/// Creates a builder using [`ASSERTION_LIFETIME`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the assertion lifetime.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}

	/// Builds and signs an assertion for `audience` using the current clock.
	pub fn build(
		&self,
		client_id: &ClientId,
		credential: &CertificateCredential,
		audience: &str,
	) -> Result<ClientAssertion> {
		self.build_at(client_id, credential, audience, OffsetDateTime::now_utc())
	}

	/// Builds and signs an assertion issued at `now`.
	pub fn build_at(
		&self,
		client_id: &ClientId,
		credential: &CertificateCredential,
		audience: &str,
		now: OffsetDateTime,
	) -> Result<ClientAssertion> {
		let algorithm = credential.key().algorithm();

		KeyFamily::of(algorithm)?;

		let verifying_key = credential.verifying_key()?;
		let mut header = Header::new(algorithm);

		header.x5t_s256 = Some(credential.thumbprint_sha256());

		if credential.sends_x5c() {
			header.x5c = Some(vec![STANDARD.encode(credential.certificate_der())]);
		}

		let expires_at = now + self.lifetime;
		let jwt_id = Uuid::new_v4().to_string();
		let claims = AssertionClaims {
			aud: audience.to_owned(),
			exp: expires_at.unix_timestamp(),
			iat: now.unix_timestamp(),
			iss: client_id.to_string(),
			jti: jwt_id.clone(),
			nbf: now.unix_timestamp(),
			sub: client_id.to_string(),
		};
		let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
		let signature = credential.sign(signing_input.as_bytes())?;
		let verified =
			crypto::verify(&signature, signing_input.as_bytes(), &verifying_key, algorithm)
				.unwrap_or(false);

		if !verified {
			return Err(SigningError::KeyMismatch.into());
		}

		Ok(ClientAssertion {
			value: SecretString::new(format!("{signing_input}.{signature}")),
			jwt_id,
			expires_at,
		})
	}
}
impl Default for AssertionBuilder {
	fn default() -> Self {
		Self { lifetime: ASSERTION_LIFETIME }
	}
}

fn encode_segment<T>(value: &T) -> Result<String, SigningError>
where
	T: Serialize,
{
	let json =
		serde_json::to_vec(value).map_err(|e| SigningError::Failed { reason: e.to_string() })?;

	Ok(URL_SAFE_NO_PAD.encode(json))
}
