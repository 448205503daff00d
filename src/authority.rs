//! Authority validation and static token endpoint derivation.
//!
//! An authority is the absolute base URL of the identity provider, e.g.
//! `https://login.microsoftonline.com/contoso`. The token endpoint is derived by joining
//! the authority with a fixed well-known path; no discovery request is ever made.

// std
use std::net::IpAddr;
// crates.io
use url::{Host, ParseError};
// self
use crate::_prelude::*;

/// Well-known token endpoint path appended to an authority.
pub const DEFAULT_TOKEN_PATH: &str = "oauth2/v2.0/token";

/// Reasons an authority string is rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityError {
	/// Input is not an absolute URL (no scheme).
	#[error("Authority `{authority}` is not an absolute URL.")]
	MissingScheme {
		/// Rejected input.
		authority: String,
	},
	/// Input has a scheme but no host.
	#[error("Authority `{authority}` has no host.")]
	MissingHost {
		/// Rejected input.
		authority: String,
	},
	/// Input cannot be parsed as a URL.
	#[error("Authority `{authority}` cannot be parsed.")]
	Parse {
		/// Rejected input.
		authority: String,
		/// Underlying parsing failure.
		#[source]
		source: ParseError,
	},
	/// Scheme is neither `https` nor loopback `http`.
	#[error("Authority `{authority}` uses unsupported scheme `{scheme}`.")]
	UnsupportedScheme {
		/// Rejected input.
		authority: String,
		/// Offending scheme.
		scheme: String,
	},
	/// Authority carries a query string or fragment.
	#[error("Authority `{authority}` must not carry a query or fragment.")]
	QueryOrFragment {
		/// Rejected input.
		authority: String,
	},
	/// Token endpoint cannot be joined onto the authority.
	#[error("Token path `{path}` cannot be joined onto the authority.")]
	InvalidTokenPath {
		/// Configured token path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: ParseError,
	},
}

/// Validates authority strings and derives their token endpoints.
#[derive(Clone, Debug)]
pub struct AuthorityResolver {
	token_path: String,
}
impl AuthorityResolver {
	/// Creates a resolver using [`DEFAULT_TOKEN_PATH`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the path appended to the authority, e.g. `oauth2/token` for v1 endpoints.
	pub fn with_token_path(mut self, path: impl AsRef<str>) -> Self {
		self.token_path = path.as_ref().trim_matches('/').to_owned();

		self
	}

	/// Returns the configured token path.
	pub fn token_path(&self) -> &str {
		&self.token_path
	}

	/// Resolves `authority` into a canonical [`Authority`] without any network I/O.
	pub fn resolve(&self, authority: &str) -> Result<Authority, AuthorityError> {
		let raw = authority.trim();
		let mut url = Url::parse(raw).map_err(|source| match source {
			ParseError::RelativeUrlWithoutBase => {
				AuthorityError::MissingScheme { authority: raw.to_owned() }
			},
			ParseError::EmptyHost => AuthorityError::MissingHost { authority: raw.to_owned() },
			source => AuthorityError::Parse { authority: raw.to_owned(), source },
		})?;

		if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
			return Err(AuthorityError::MissingHost { authority: raw.to_owned() });
		}
		if url.query().is_some() || url.fragment().is_some() {
			return Err(AuthorityError::QueryOrFragment { authority: raw.to_owned() });
		}

		match url.scheme() {
			"https" => {},
			"http" if is_loopback(url.host()) => {},
			scheme => {
				return Err(AuthorityError::UnsupportedScheme {
					authority: raw.to_owned(),
					scheme: scheme.to_owned(),
				});
			},
		}

		let path = url.path().trim_end_matches('/').to_owned();

		url.set_path(&path);

		let canonical = url.as_str().trim_end_matches('/').to_owned();
		let token_endpoint =
			Url::parse(&format!("{canonical}/{}", self.token_path)).map_err(|source| {
				AuthorityError::InvalidTokenPath { path: self.token_path.clone(), source }
			})?;

		Ok(Authority { url, canonical, token_endpoint })
	}
}
impl Default for AuthorityResolver {
	fn default() -> Self {
		Self { token_path: DEFAULT_TOKEN_PATH.to_owned() }
	}
}

/// Validated authority with its derived token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Authority {
	url: Url,
	canonical: String,
	token_endpoint: Url,
}
impl Authority {
	/// Canonical form (lower-cased host, no trailing slash) used in cache keys.
	pub fn as_str(&self) -> &str {
		&self.canonical
	}

	/// Parsed authority URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Token endpoint derived from the authority; also the assertion audience.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// First path segment of the authority (tenant or policy), if any.
	pub fn tenant(&self) -> Option<&str> {
		self.url.path_segments().and_then(|mut segments| segments.next()).filter(|s| !s.is_empty())
	}
}
impl Display for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.canonical)
	}
}

fn is_loopback(host: Option<Host<&str>>) -> bool {
	match host {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
