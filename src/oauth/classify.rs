//! Maps token endpoint failures onto the crate error taxonomy.
//!
//! Classification is driven by the HTTP status first and the body shape second:
//! 408, 429, and 5xx are transient; other 4xx are denials; a success status with an
//! unusable body is malformed.
//!
//! `oauth2` only parses a token body out of `200 OK`. Any other 2xx is read as an error
//! response, so a `201` carrying a token surfaces as [`MalformedResponseError::Parse`]
//! and an empty `204` as [`MalformedResponseError::Unexpected`].

// self
use crate::{
	_prelude::*,
	error::{MalformedResponseError, TransientError},
	http::ResponseMetadata,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Coarse HTTP status buckets used for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
	/// 2xx.
	Success,
	/// 4xx other than 408 and 429.
	Denied,
	/// 408, 429, and 5xx.
	Transient,
	/// Anything else (1xx, 3xx, out of range).
	Unexpected,
}
impl StatusClass {
	/// Buckets an HTTP status code.
	pub fn of(status: u16) -> Self {
		match status {
			200..=299 => Self::Success,
			408 | 429 => Self::Transient,
			400..=499 => Self::Denied,
			500..=599 => Self::Transient,
			_ => Self::Unexpected,
		}
	}
}

/// OAuth error codes that signal a temporary condition when no status is known.
const TRANSIENT_OAUTH_CODES: [&str; 2] = ["temporarily_unavailable", "server_error"];

/// Classifies a parsed OAuth error body (`error` / `error_description`).
pub(crate) fn server_response(
	meta: Option<&ResponseMetadata>,
	code: &str,
	description: Option<&str>,
) -> Error {
	let status = meta_status(meta);
	let transient = match status.map(StatusClass::of) {
		Some(class) => class == StatusClass::Transient,
		None => TRANSIENT_OAUTH_CODES.contains(&code),
	};

	if transient {
		let message = match description {
			Some(description) => format!("{code}: {description}"),
			None => code.to_owned(),
		};

		return TransientError::TokenEndpoint { message, status, retry_after: meta_retry_after(meta) }
			.into();
	}

	Error::AuthorizationDenied {
		code: code.to_owned(),
		description: description.map(ToOwned::to_owned),
		status,
	}
}

/// Classifies a body that failed to parse as either a token or an OAuth error.
pub(crate) fn unparsed_body(
	meta: Option<&ResponseMetadata>,
	source: serde_path_to_error::Error<serde_json::Error>,
	body: &[u8],
) -> Error {
	let status = meta_status(meta);

	match status.map(StatusClass::of) {
		Some(StatusClass::Success) | None =>
			MalformedResponseError::Parse { source: Arc::new(source), status }.into(),
		Some(class) => status_failure(meta, class, preview(body)),
	}
}

/// Classifies responses `oauth2` could not interpret at all.
pub(crate) fn unexpected(meta: Option<&ResponseMetadata>, message: String) -> Error {
	match meta_status(meta).map(StatusClass::of) {
		Some(class @ (StatusClass::Denied | StatusClass::Transient)) =>
			status_failure(meta, class, Some(message)),
		_ => MalformedResponseError::Unexpected { message, status: meta_status(meta) }.into(),
	}
}

fn status_failure(meta: Option<&ResponseMetadata>, class: StatusClass, detail: Option<String>) -> Error {
	let status = meta_status(meta);
	let label = status.map_or_else(|| "unknown".to_owned(), |code| code.to_string());

	match class {
		StatusClass::Denied => Error::AuthorizationDenied {
			code: format!("http_{label}"),
			description: detail,
			status,
		},
		StatusClass::Transient => TransientError::TokenEndpoint {
			message: match detail {
				Some(detail) => format!("HTTP {label}: {detail}"),
				None => format!("HTTP {label}"),
			},
			status,
			retry_after: meta_retry_after(meta),
		}
		.into(),
		StatusClass::Success | StatusClass::Unexpected => MalformedResponseError::Unexpected {
			message: detail.unwrap_or_else(|| format!("HTTP {label}")),
			status,
		}
		.into(),
	}
}

fn preview(body: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return None;
	}

	Some(text.chars().take(BODY_PREVIEW_LIMIT).collect())
}

pub(crate) fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

pub(crate) fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
