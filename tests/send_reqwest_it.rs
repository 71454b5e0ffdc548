// std
use std::{
	sync::{Arc, Mutex},
	time::Duration,
};
// crates.io
use httpmock::prelude::*;
// self
use ratelane::{
	client::{Payload, RequestClient, ResponseKind, SendOptions},
	error::Error,
	http::{
		HEADER_CLIENT_IDENTITY, HEADER_CLIENT_QUOTA, HEADER_RATE_LIMIT, HEADER_RATE_REMAINING,
		HEADER_RATE_RESET, ReqwestTransport,
	},
	session::{CredentialProvider, MemorySession},
	telemetry::{QuotaSnapshot, QuotaObserver},
	url::Url,
};

const TOKEN: &str = "test-token";

fn build_client(server: &MockServer) -> RequestClient<ReqwestTransport> {
	let base_url =
		Url::parse(&server.base_url()).expect("Mock server base URL should parse successfully.");
	let session: Arc<dyn CredentialProvider> = Arc::new(MemorySession::with_token(TOKEN));

	RequestClient::new(base_url, session)
}

fn build_signed_out_client(server: &MockServer) -> RequestClient<ReqwestTransport> {
	let base_url =
		Url::parse(&server.base_url()).expect("Mock server base URL should parse successfully.");
	let session: Arc<dyn CredentialProvider> = Arc::new(MemorySession::default());

	RequestClient::new(base_url, session)
}

#[derive(Default)]
struct SnapshotRecorder(Mutex<Vec<QuotaSnapshot>>);
impl QuotaObserver for SnapshotRecorder {
	fn on_snapshot(&self, snapshot: &QuotaSnapshot) {
		self.0.lock().expect("Recorder mutex should not be poisoned.").push(snapshot.clone());
	}
}

#[tokio::test]
async fn send_attaches_the_full_header_contract() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/treasury")
				.header("authorization", format!("Bearer {TOKEN}"))
				.header(HEADER_CLIENT_IDENTITY, "ratelane")
				// One slot is consumed before dispatch, so 49 of the default 50 remain.
				.header(HEADER_CLIENT_QUOTA, "49")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "period": "2026-Q3" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"balance\":1250}");
		})
		.await;
	let payload = client
		.send("treasury", &serde_json::json!({ "period": "2026-Q3" }), SendOptions::default())
		.await
		.expect("Request against the mock backend should succeed.");

	assert_eq!(payload, Payload::Json(serde_json::json!({ "balance": 1250 })));

	mock.assert_async().await;
}

#[tokio::test]
async fn telemetry_headers_broadcast_exactly_one_snapshot() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let recorder = Arc::new(SnapshotRecorder::default());

	client.quota_bus.subscribe(recorder.clone());

	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/dashboard");
			then.status(200)
				.header(HEADER_RATE_LIMIT, "100")
				.header(HEADER_RATE_REMAINING, "42")
				.header(HEADER_RATE_RESET, "1735689600")
				.body("{}");
		})
		.await;

	client
		.send("dashboard", &serde_json::json!({}), SendOptions::default())
		.await
		.expect("Request with telemetry headers should succeed.");

	let seen = recorder.0.lock().expect("Recorder mutex should not be poisoned.").clone();

	assert_eq!(seen, vec![QuotaSnapshot {
		limit: 100,
		remaining: 42,
		reset_at: Some("1735689600".into()),
	}]);
}

#[tokio::test]
async fn throttled_backend_surfaces_retry_after_without_retrying() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/payroll");
			then.status(429).header("retry-after", "60");
		})
		.await;
	let err = client
		.send("payroll", &serde_json::json!({}), SendOptions::default().with_max_retries(2))
		.await
		.expect_err("Throttled request should fail.");

	assert!(matches!(err, Error::ServerRateLimited { retry_after_secs: 60 }));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn error_payload_message_is_extracted() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/unknown");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"error\":\"unknown endpoint\"}");
		})
		.await;
	let err = client
		.send("unknown", &serde_json::json!({}), SendOptions::default())
		.await
		.expect_err("Unknown endpoint should fail.");

	assert!(matches!(err, Error::Http { status: 404, ref message } if message == "unknown endpoint"));
}

#[tokio::test]
async fn signed_out_session_never_reaches_the_network() {
	let server = MockServer::start_async().await;
	let client = build_signed_out_client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/dashboard");
			then.status(200).body("{}");
		})
		.await;
	let err = client
		.send("dashboard", &serde_json::json!({}), SendOptions::default().with_max_retries(2))
		.await
		.expect_err("Signed-out session should fail the call.");

	assert!(matches!(err, Error::NoSession));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn exhausted_local_quota_never_reaches_the_network() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/dashboard");
			then.status(200).body("{}");
		})
		.await;

	// Drain the default 50-slot window locally before any send.
	for _ in 0..50 {
		assert!(client.quota.can_make_request("dashboard"));
	}

	let err = client
		.send("dashboard", &serde_json::json!({}), SendOptions::default())
		.await
		.expect_err("Drained window should fail the call.");

	assert!(matches!(err, Error::ClientRateLimited { ref endpoint } if endpoint == "dashboard"));
	assert_eq!(client.quota.remaining_requests("dashboard"), 0);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn text_responses_are_returned_verbatim() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/export-csv");
			then.status(200)
				.header("content-type", "text/csv")
				.body("account;amount\n572000;1250");
		})
		.await;
	let payload = client
		.send(
			"export-csv",
			&serde_json::json!({ "report": "treasury" }),
			SendOptions::default().with_response_kind(ResponseKind::Text),
		)
		.await
		.expect("CSV export should succeed.");

	assert_eq!(payload, Payload::Text("account;amount\n572000;1250".into()));
}

#[tokio::test]
async fn slow_backend_is_aborted_by_the_timeout() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/treasury");
			then.status(200).body("{}").delay(Duration::from_millis(500));
		})
		.await;
	let err = client
		.send(
			"treasury",
			&serde_json::json!({}),
			SendOptions::default().with_timeout(Duration::from_millis(50)),
		)
		.await
		.expect_err("Slow backend should trip the timeout.");

	assert!(matches!(err, Error::Aborted));
}
