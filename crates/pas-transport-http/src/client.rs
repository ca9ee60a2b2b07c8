//! reqwest-backed transport adapter.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use pas_transport::{
    ByteStream, ExportAcceptance, ExportOutput, ExportRequest, JobHandle, PollOutcome,
    TransportAdapter, TransportError,
};
use serde_json::Value;
use url::Url;

const FHIR_JSON: &str = "application/fhir+json";

/// HTTP transport for a FHIR service that implements Bulk Data exports.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport for the given service base URL (any path
    /// prefix included, no trailing slash required).
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Attaches a bearer token to every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url).header("Accept", FHIR_JSON);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Resolves a possibly relative locator against the service base.
    fn resolve(&self, locator: &str) -> Result<Url, TransportError> {
        match Url::parse(locator) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(&self.base_url).map_err(|e| {
                    TransportError::invalid_locator(&self.base_url, e.to_string())
                })?;
                base.join(locator)
                    .map_err(|e| TransportError::invalid_locator(locator, e.to_string()))
            }
            Err(e) => Err(TransportError::invalid_locator(locator, e.to_string())),
        }
    }

    fn kick_off_url(&self, request: &ExportRequest) -> Result<Url, TransportError> {
        // A bare id is shorthand for a Group reference.
        let reference = if request.group_reference.contains('/') {
            request.group_reference.trim_matches('/').to_string()
        } else {
            format!("Group/{}", request.group_reference)
        };
        self.resolve(&format!("{}/{}/$export", self.base_url, reference))
    }
}

#[async_trait]
impl TransportAdapter for HttpTransport {
    async fn request_export(
        &self,
        request: &ExportRequest,
        prefer_async: bool,
    ) -> Result<ExportAcceptance, TransportError> {
        let url = self.kick_off_url(request)?;

        // Absent filters are absent parameters, never empty strings.
        let mut query: Vec<(&str, String)> = Vec::new();
        if !request.resource_types.is_empty() {
            query.push(("_type", request.resource_types.join(",")));
        }
        if let Some(since) = &request.since {
            query.push(("_since", since.to_rfc3339()));
        }

        let mut req = self.request(url).query(&query);
        if prefer_async {
            req = req.header("Prefer", "respond-async");
        }

        let response = req
            .send()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status();

        match status.as_u16() {
            202 => {
                let job_handle = response
                    .headers()
                    .get("Content-Location")
                    .and_then(|v| v.to_str().ok())
                    .map(JobHandle::from_status_endpoint);

                tracing::info!(
                    group = %request.group_reference,
                    job_id = job_handle.as_ref().map(|h| h.job_id.as_str()),
                    "Export request accepted"
                );

                Ok(ExportAcceptance {
                    accepted: true,
                    status_code: 202,
                    job_handle,
                    immediate_body: None,
                })
            }
            200 => {
                // Synchronous success despite respond-async; preserved
                // for the caller to classify.
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| TransportError::body(e.to_string()))?;
                Ok(ExportAcceptance {
                    accepted: false,
                    status_code: 200,
                    job_handle: None,
                    immediate_body: Some(body),
                })
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(TransportError::unexpected_status(code, body))
            }
        }
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<PollOutcome, TransportError> {
        let url = self.resolve(&handle.status_endpoint)?;
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status();

        match status.as_u16() {
            202 => Ok(PollOutcome::running(202)),
            200 => {
                let manifest: Value = response
                    .json()
                    .await
                    .map_err(|e| TransportError::body(e.to_string()))?;
                parse_manifest(&manifest)
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(TransportError::unexpected_status(code, body))
            }
        }
    }

    async fn open_stream(&self, locator: &str) -> Result<Box<dyn ByteStream>, TransportError> {
        let url = self.resolve(locator)?;
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::unexpected_status(status.as_u16(), body));
        }
        Ok(Box::new(HttpByteStream {
            inner: Some(Box::pin(response.bytes_stream())),
        }))
    }

    async fn fetch_text(&self, locator: &str) -> Result<String, TransportError> {
        let url = self.resolve(locator)?;
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::unexpected_status(status.as_u16(), body));
        }
        response
            .text()
            .await
            .map_err(|e| TransportError::body(e.to_string()))
    }
}

/// Parses a completed-export manifest into a terminal poll outcome.
fn parse_manifest(manifest: &Value) -> Result<PollOutcome, TransportError> {
    let outputs = match manifest.get("output") {
        Some(output) => serde_json::from_value::<Vec<ExportOutput>>(output.clone())
            .map_err(|e| TransportError::body(format!("Malformed manifest output list: {e}")))?,
        None => Vec::new(),
    };

    let transaction_time = manifest
        .get("transactionTime")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(PollOutcome::completed(200, outputs, transaction_time))
}

/// Response body stream; dropping the inner stream aborts the
/// underlying connection, which is how `close` releases the socket.
struct HttpByteStream {
    inner: Option<Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>>,
}

#[async_trait]
impl ByteStream for HttpByteStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        let Some(stream) = self.inner.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => {
                self.inner = None;
                Err(TransportError::body(e.to_string()))
            }
            None => {
                self.inner = None;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        self.inner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_manifest() {
        let manifest = json!({
            "transactionTime": "2024-05-01T12:00:00Z",
            "request": "http://fhir.test/Group/G1/$export",
            "output": [
                { "type": "Patient", "url": "http://fhir.test/files/patient.ndjson" },
                { "type": "Claim", "url": "http://fhir.test/files/claim.ndjson" }
            ],
            "error": []
        });

        let outcome = parse_manifest(&manifest).unwrap();
        assert!(outcome.done);
        let outputs = outcome.outputs.unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].resource_type, "Patient");
        assert_eq!(outputs[1].locator, "http://fhir.test/files/claim.ndjson");
        assert_eq!(
            outcome.transaction_time.unwrap().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_manifest_without_outputs() {
        let outcome = parse_manifest(&json!({})).unwrap();
        assert!(outcome.done);
        assert_eq!(outcome.outputs.as_deref(), Some(&[][..]));
        assert!(outcome.transaction_time.is_none());
    }

    #[tokio::test]
    async fn test_request_export_accepted() {
        let server = MockServer::start().await;
        let status_url = format!("{}/_async-status/job-1", server.uri());

        Mock::given(method("GET"))
            .and(path("/Group/G1/$export"))
            .and(header("Prefer", "respond-async"))
            .and(query_param("_type", "Patient,Claim"))
            .and(query_param("_since", "2024-01-01T00:00:00+00:00"))
            .respond_with(ResponseTemplate::new(202).insert_header(
                "Content-Location",
                status_url.as_str(),
            ))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let request = ExportRequest::new("G1")
            .with_resource_types(["Patient", "Claim"])
            .with_since("2024-01-01T00:00:00Z".parse().unwrap());

        let acceptance = transport.request_export(&request, true).await.unwrap();
        assert!(acceptance.accepted);
        assert_eq!(acceptance.status_code, 202);
        let handle = acceptance.job_handle.unwrap();
        assert_eq!(handle.job_id, "job-1");
        assert_eq!(handle.status_endpoint, status_url);
    }

    #[tokio::test]
    async fn test_request_export_omits_absent_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Group/G1/$export"))
            .and(query_param_is_missing("_type"))
            .and(query_param_is_missing("_since"))
            .respond_with(
                ResponseTemplate::new(202).insert_header("Content-Location", "/_async-status/j"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let acceptance = transport
            .request_export(&ExportRequest::new("Group/G1"), true)
            .await
            .unwrap();
        assert!(acceptance.accepted);
    }

    #[tokio::test]
    async fn test_request_export_synchronous_success_not_accepted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Group/G1/$export"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"resourceType": "Bundle"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let acceptance = transport
            .request_export(&ExportRequest::new("G1"), true)
            .await
            .unwrap();

        assert!(!acceptance.accepted);
        assert_eq!(acceptance.status_code, 200);
        assert!(acceptance.job_handle.is_none());
        assert_eq!(
            acceptance.immediate_body.unwrap()["resourceType"],
            "Bundle"
        );
    }

    #[tokio::test]
    async fn test_request_export_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Group/G1/$export"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let err = transport
            .request_export(&ExportRequest::new("G1"), true)
            .await
            .unwrap_err();
        assert!(err.is_unexpected_status());
    }

    #[tokio::test]
    async fn test_poll_status_running_then_completed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_async-status/job-1"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/_async-status/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactionTime": "2024-05-01T12:00:00Z",
                "output": [{ "type": "Patient", "url": "/files/patient.ndjson" }]
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        // Relative status endpoints are resolved against the base.
        let handle = JobHandle::from_status_endpoint("/_async-status/job-1");

        let first = transport.poll_status(&handle).await.unwrap();
        assert!(!first.done);

        let second = transport.poll_status(&handle).await.unwrap();
        assert!(second.done);
        assert_eq!(second.outputs.unwrap()[0].resource_type, "Patient");
    }

    #[tokio::test]
    async fn test_poll_status_error_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/_async-status/job-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("export failed"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let handle = JobHandle::from_status_endpoint("/_async-status/job-1");
        let err = transport.poll_status(&handle).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_open_stream_feeds_ndjson_reader() {
        let server = MockServer::start().await;
        let body = "{\"resourceType\":\"Patient\",\"id\":\"1\"}\n\
                    {\"resourceType\":\"Patient\",\"id\":\"2\"}\n";

        Mock::given(method("GET"))
            .and(path("/files/patient.ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let stream = transport.open_stream("/files/patient.ndjson").await.unwrap();

        let mut ids = Vec::new();
        let delivered = pas_ndjson::stream_rows(
            stream,
            |_, record| ids.push(record["id"].as_str().unwrap().to_string()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_open_stream_not_found() {
        let server = MockServer::start().await;

        let transport = HttpTransport::new(&server.uri());
        let err = transport.open_stream("/files/missing.ndjson").await.err().unwrap();
        assert!(err.is_unexpected_status());
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/patient.ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"a\":1}\n"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri());
        let text = transport.fetch_text("/files/patient.ndjson").await.unwrap();
        assert_eq!(text, "{\"a\":1}\n");
    }

    #[tokio::test]
    async fn test_bearer_token_applied() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/a.ndjson"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri()).with_bearer_token("secret");
        assert!(transport.fetch_text("/files/a.ndjson").await.is_ok());
    }
}
