//! Scripted in-process transport for unit tests that need to inspect request bodies.

// std
use std::{collections::VecDeque, time::Duration as StdDuration};
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	error::TransientError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::TransportErrorMapper,
};

/// Failure produced by [`StubHttpClient`].
#[derive(Debug, ThisError)]
pub enum StubTransportError {
	/// Scripted network failure.
	#[error("stub network failure: {0}")]
	Network(String),
	/// The scripted delay exceeded the request timeout.
	#[error("stub request timed out")]
	Timeout,
}

/// Maps [`StubTransportError`] the way a real transport mapper would.
#[derive(Clone, Debug, Default)]
pub struct StubTransportErrorMapper;
impl TransportErrorMapper<StubTransportError> for StubTransportErrorMapper {
	fn map_transport_error(
		&self,
		_: Option<&ResponseMetadata>,
		error: HttpClientError<StubTransportError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => match *inner {
				StubTransportError::Timeout => TransientError::Timeout.into(),
				network => TransientError::network(network).into(),
			},
			other => TransientError::network(other).into(),
		}
	}
}

/// Request captured by [`StubHttpClient`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	/// Target URI.
	pub uri: String,
	/// `Authorization` header, if any.
	pub authorization: Option<String>,
	/// Decoded form body.
	pub body: Vec<(String, String)>,
}
impl RecordedRequest {
	/// First value of form field `name`.
	pub fn form(&self, name: &str) -> Option<&str> {
		self.body.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
	}
}

#[derive(Clone, Debug)]
enum StubReply {
	Respond { status: u16, body: String, delay: Option<StdDuration> },
	Fail(String),
}

#[derive(Debug, Default)]
struct StubState {
	script: Mutex<VecDeque<StubReply>>,
	requests: Mutex<Vec<RecordedRequest>>,
	completed: Mutex<usize>,
}
impl StubState {
	fn next_reply(&self) -> Option<StubReply> {
		let mut script = self.script.lock();

		// The last scripted reply repeats.
		if script.len() > 1 { script.pop_front() } else { script.front().cloned() }
	}
}

/// In-process [`TokenHttpClient`] replaying scripted responses.
#[derive(Clone, Debug, Default)]
pub struct StubHttpClient(Arc<StubState>);
impl StubHttpClient {
	/// Creates a stub with no scripted replies.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the script with one JSON reply repeated for every request.
	pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
		self.replace(StubReply::Respond { status, body: body.into(), delay: None })
	}

	/// Replaces the script with one delayed JSON reply.
	pub fn reply_after(&self, delay: StdDuration, status: u16, body: impl Into<String>) -> &Self {
		self.replace(StubReply::Respond { status, body: body.into(), delay: Some(delay) })
	}

	/// Appends a reply served once before the ones after it.
	pub fn then_reply(&self, status: u16, body: impl Into<String>) -> &Self {
		self.0.script.lock().push_back(StubReply::Respond { status, body: body.into(), delay: None });

		self
	}

	/// Replaces the script with a transport failure.
	pub fn fail(&self, message: impl Into<String>) -> &Self {
		self.replace(StubReply::Fail(message.into()))
	}

	/// Every request received so far.
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.0.requests.lock().clone()
	}

	/// Most recent request.
	pub fn last_request(&self) -> Option<RecordedRequest> {
		self.0.requests.lock().last().cloned()
	}

	/// Number of requests received.
	pub fn calls(&self) -> usize {
		self.0.requests.lock().len()
	}

	/// Number of requests that ran to completion (were not dropped mid-flight).
	pub fn completed(&self) -> usize {
		*self.0.completed.lock()
	}

	fn replace(&self, reply: StubReply) -> &Self {
		*self.0.script.lock() = VecDeque::from([reply]);

		self
	}
}
impl TokenHttpClient for StubHttpClient {
	type Handle = StubHandle;
	type TransportError = StubTransportError;

	fn handle(&self, slot: ResponseMetadataSlot, timeout: StdDuration) -> Self::Handle {
		StubHandle { state: self.0.clone(), slot, timeout }
	}
}

/// Handle returned by [`StubHttpClient`].
#[derive(Clone, Debug)]
pub struct StubHandle {
	state: Arc<StubState>,
	slot: ResponseMetadataSlot,
	timeout: StdDuration,
}
impl<'c> AsyncHttpClient<'c> for StubHandle {
	type Error = HttpClientError<StubTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();
			self.state.requests.lock().push(RecordedRequest {
				uri: request.uri().to_string(),
				authorization: request
					.headers()
					.get(AUTHORIZATION)
					.and_then(|value| value.to_str().ok())
					.map(ToOwned::to_owned),
				body: form_urlencoded::parse(request.body()).into_owned().collect(),
			});

			let reply = self.state.next_reply().unwrap_or_else(|| {
				StubReply::Fail("no scripted reply".into())
			});
			let (status, body) = match reply {
				StubReply::Respond { status, body, delay } => {
					if let Some(delay) = delay {
						if delay > self.timeout {
							tokio::time::sleep(self.timeout).await;

							return Err(HttpClientError::Reqwest(Box::new(StubTransportError::Timeout)));
						}

						tokio::time::sleep(delay).await;
					}

					(status, body)
				},
				StubReply::Fail(message) =>
					return Err(HttpClientError::Reqwest(Box::new(StubTransportError::Network(message)))),
			};

			self.slot.store(ResponseMetadata { status: Some(status), retry_after: None });
			*self.state.completed.lock() += 1;

			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() = StatusCode::from_u16(status).map_err(|e| {
				HttpClientError::Other(format!("invalid scripted status: {e}"))
			})?;
			response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

			Ok(response)
		})
	}
}
