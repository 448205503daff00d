//! Confidential-client OAuth 2.0 token acquisition: client secrets, certificate-signed
//! RFC 7523 assertions, singleflight token caching, and typed failure classification.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod assertion;
pub mod auth;
pub mod authority;
pub mod cache;
pub mod client;
pub mod credential;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixture helpers for tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	#[cfg(test)] mod stub;

	pub use crate::_prelude::*;
	#[cfg(test)] pub use stub::*;

	// std
	use std::path::{Path, PathBuf};
	// crates.io
	use jsonwebtoken::Algorithm;
	// self
	use crate::credential::CertificateCredential;

	/// Directory holding the PEM fixtures shipped with the crate.
	pub fn fixture_dir() -> PathBuf {
		Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
	}

	/// Reads a fixture file by name.
	pub fn fixture(name: &str) -> Vec<u8> {
		let path = fixture_dir().join(name);

		std::fs::read(&path)
			.unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
	}

	/// Builds a certificate credential from a key/certificate fixture pair.
	pub fn certificate_fixture(key: &str, cert: &str, algorithm: Algorithm) -> CertificateCredential {
		CertificateCredential::from_pem(&fixture(key), &fixture(cert), algorithm)
			.expect("Certificate fixture should load.")
	}

	/// RSA certificate credential matching `client.crt.pem`.
	pub fn rsa_certificate_fixture() -> CertificateCredential {
		certificate_fixture("client.key.pem", "client.crt.pem", Algorithm::RS256)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
