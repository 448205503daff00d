//! Crate-level error taxonomy shared by the resolver, credential, and client layers.
//!
//! [`Error`] is `Clone` so every caller coalesced onto one in-flight token request can
//! receive the same failure; wrapped sources are therefore held behind [`Arc`].

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ScopeValidationError},
	authority::AuthorityError,
	cache::TokenEntryBuilderError,
	credential::{CertificateError, SigningError},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shareable boxed error used for transport and builder sources.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Authority URL is not absolute or violates the accepted shape.
	#[error(transparent)]
	InvalidAuthority(#[from] AuthorityError),
	/// Certificate bytes cannot be parsed or carry an unsupported key.
	#[error(transparent)]
	InvalidCertificate(#[from] CertificateError),
	/// Client assertion could not be signed.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Token endpoint answered with a body that does not form a usable token.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
	/// Authorization server rejected the request (bad credentials, unknown scope, ...).
	#[error("Authorization server denied the request with `{code}`.")]
	AuthorizationDenied {
		/// OAuth `error` code, or `http_<status>` when the body was not an OAuth error.
		code: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Temporary upstream or network failure; callers may retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// The caller cancelled the acquisition before it completed.
	#[error("Token acquisition was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` when the failure is worth retrying.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient(_))
	}

	/// Retry-After hint captured from the token endpoint, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Transient(inner) => inner.retry_after(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before a request is sent.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying request builder failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] IdentifierError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// No scope was requested.
	#[error("At least one scope must be requested.")]
	EmptyScope,
	/// Client secret credential is empty.
	#[error("Client secret cannot be empty.")]
	EmptyClientSecret,
	/// Pre-built client assertion is empty.
	#[error("Client assertion cannot be empty.")]
	EmptyClientAssertion,
	/// Request timeout is zero, negative, or too large for the transport.
	#[error("Request timeout must be positive, got {timeout}.")]
	InvalidTimeout {
		/// Rejected timeout.
		timeout: Duration,
	},
	/// Expiry skew is negative, which would serve tokens past `expires_at`.
	#[error("Expiry skew cannot be negative, got {skew}.")]
	NegativeExpirySkew {
		/// Rejected skew.
		skew: Duration,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint bodies that cannot be turned into a cache entry.
#[derive(Clone, Debug, ThisError)]
pub enum MalformedResponseError {
	/// Success body is not the expected JSON document.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response shape was not recognized at all.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the unexpected response.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Access token is present but empty.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// Response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Response carried an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Response carried a zero `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Cache entry could not be assembled from the response.
	#[error("Unable to build token cache entry.")]
	Entry(#[from] TokenEntryBuilderError),
}

/// Temporary failure variants (safe to retry).
#[derive(Clone, Debug, ThisError)]
pub enum TransientError {
	/// Request exceeded its deadline.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
	/// Underlying HTTP client reported a network or I/O failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Token endpoint answered with a retryable status.
	#[error("Token endpoint returned a retryable response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure, including the OAuth error when one was returned.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl TransientError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Retry-After hint from upstream, if supplied.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::TokenEndpoint { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// HTTP status code, when the failure came from a response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenEndpoint { status, .. } => *status,
			_ => None,
		}
	}
}
