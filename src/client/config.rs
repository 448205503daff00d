//! Immutable client configuration validated by [`TokenClient`](crate::client::TokenClient).

// std
use std::{num::NonZeroUsize, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	authority::DEFAULT_TOKEN_PATH,
	cache::{DEFAULT_EXPIRY_SKEW, TokenCache},
	credential::CredentialMaterial,
	error::ConfigError,
};

/// Default deadline for one token endpoint request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// How a client secret is presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretAuthMethod {
	/// `client_secret_post`: `client_id` and `client_secret` in the form body.
	#[default]
	Post,
	/// `client_secret_basic`: HTTP Basic authorization header.
	Basic,
}

/// Tunables shared by every acquisition made through one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
	/// Per-request deadline unless a request overrides it.
	#[serde(with = "duration_secs")]
	pub timeout: Duration,
	/// Margin before `expires_at` at which cached tokens stop being served.
	#[serde(with = "duration_secs")]
	pub expiry_skew: Duration,
	/// Optional bound on cached entries; least recently used entries are evicted first.
	pub cache_capacity: Option<NonZeroUsize>,
	/// Presentation of [`CredentialMaterial::Secret`].
	pub secret_auth_method: SecretAuthMethod,
	/// Path appended to the authority to form the token endpoint.
	pub token_path: String,
}
impl ClientOptions {
	/// Rejects a non-positive timeout and a negative expiry skew.
	///
	/// A zero cache capacity cannot be expressed; `cache_capacity` is a [`NonZeroUsize`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		transport_timeout(self.timeout)?;
		validate_expiry_skew(self.expiry_skew)
	}
}
impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_REQUEST_TIMEOUT,
			expiry_skew: DEFAULT_EXPIRY_SKEW,
			cache_capacity: None,
			secret_auth_method: SecretAuthMethod::default(),
			token_path: DEFAULT_TOKEN_PATH.to_owned(),
		}
	}
}

/// Everything a [`TokenClient`](crate::client::TokenClient) needs: identity, credential,
/// authority, and options.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Client identifier registered with the authority.
	pub client_id: ClientId,
	/// Credential proving the client's identity.
	pub credential: CredentialMaterial,
	/// Authority URL, e.g. `https://login.example.com/<tenant>`.
	pub authority: String,
	/// Acquisition tunables.
	pub options: ClientOptions,
	/// Cache shared with other clients; a private cache is created when absent.
	pub token_cache: Option<Arc<TokenCache>>,
}
impl ClientConfig {
	/// Creates a configuration with default options.
	pub fn new(
		client_id: impl AsRef<str>,
		credential: CredentialMaterial,
		authority: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			client_id: ClientId::new(client_id)?,
			credential,
			authority: authority.into(),
			options: ClientOptions::default(),
			token_cache: None,
		})
	}

	/// Replaces the options.
	pub fn with_options(mut self, options: ClientOptions) -> Self {
		self.options = options;

		self
	}

	/// Shares an existing cache instead of creating a private one.
	pub fn with_token_cache(mut self, cache: Arc<TokenCache>) -> Self {
		self.token_cache = Some(cache);

		self
	}
}

/// Converts a configured or per-request timeout into the transport's deadline.
pub(crate) fn transport_timeout(timeout: Duration) -> Result<StdDuration, ConfigError> {
	if !timeout.is_positive() {
		return Err(ConfigError::InvalidTimeout { timeout });
	}

	StdDuration::try_from(timeout).map_err(|_| ConfigError::InvalidTimeout { timeout })
}

pub(crate) fn validate_expiry_skew(skew: Duration) -> Result<(), ConfigError> {
	if skew.is_negative() {
		return Err(ConfigError::NegativeExpirySkew { skew });
	}

	Ok(())
}

mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn options_deserialize_with_defaults() {
		let options: ClientOptions = serde_json::from_str(
			r#"{"timeout":5,"cache_capacity":16,"secret_auth_method":"basic"}"#,
		)
		.expect("Options should deserialize.");

		assert_eq!(options.timeout, Duration::seconds(5));
		assert_eq!(options.expiry_skew, DEFAULT_EXPIRY_SKEW);
		assert_eq!(options.cache_capacity, NonZeroUsize::new(16));
		assert_eq!(options.secret_auth_method, SecretAuthMethod::Basic);
		assert_eq!(options.token_path, DEFAULT_TOKEN_PATH);
	}

	#[test]
	fn options_reject_unusable_durations() {
		assert!(ClientOptions::default().validate().is_ok());

		for timeout in [Duration::ZERO, Duration::seconds(-5)] {
			assert!(matches!(
				ClientOptions { timeout, ..Default::default() }.validate(),
				Err(ConfigError::InvalidTimeout { timeout: rejected }) if rejected == timeout
			));
		}

		assert!(matches!(
			ClientOptions { expiry_skew: Duration::hours(-1), ..Default::default() }.validate(),
			Err(ConfigError::NegativeExpirySkew { .. })
		));
		assert!(ClientOptions { expiry_skew: Duration::ZERO, ..Default::default() }.validate().is_ok());
		assert_eq!(
			transport_timeout(Duration::milliseconds(250)).expect("Positive timeouts convert."),
			StdDuration::from_millis(250)
		);
	}

	#[test]
	fn zero_cache_capacity_does_not_deserialize() {
		assert!(serde_json::from_str::<ClientOptions>(r#"{"cache_capacity":0}"#).is_err());
		assert!(serde_json::from_str::<ClientOptions>(r#"{"expiry_skew":-60}"#)
			.expect("Negative skews parse and are rejected by validation.")
			.validate()
			.is_err());
	}

	#[test]
	fn config_validates_client_id() {
		let credential = CredentialMaterial::secret("secret").expect("Secret should be accepted.");

		assert!(matches!(
			ClientConfig::new("has space", credential.clone(), "https://login.example.com/t"),
			Err(ConfigError::InvalidClientId(_))
		));

		let config = ClientConfig::new("svc", credential, "https://login.example.com/t")
			.expect("Config should build.")
			.with_token_cache(Arc::new(TokenCache::new()));

		assert_eq!(config.options, ClientOptions::default());
		assert!(config.token_cache.is_some());
	}
}
