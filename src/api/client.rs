use crate::api::{AddressSpec, ApiResponse, Endpoint, QueryOptions, QueryParams, build_query};
use crate::error::ApiError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::thread;
use std::time::{Duration, Instant};

const BASE_URL: &str = "https://api.gateway.attomdata.com";
const USER_AGENT: &str = concat!("propfetch/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/json";
const API_KEY_HEADER: &str = "apikey";
const DEFAULT_DELAY_SECS: u64 = 5;

/// Pacing applied between calls of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RatePolicy {
    /// No pacing; rely on the caller to stay under the API's limits.
    None,
    /// Sleep a constant interval between calls.
    FixedDelay(Duration),
    /// Token bucket: bursts up to `capacity` calls, then paced at
    /// `refill_per_sec` calls per second.
    TokenBucket { capacity: u32, refill_per_sec: f64 },
}

impl Default for RatePolicy {
    fn default() -> Self {
        RatePolicy::FixedDelay(Duration::from_secs(DEFAULT_DELAY_SECS))
    }
}

/// Per-batch pacing state for a [`RatePolicy`].
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        let tokens = match policy {
            RatePolicy::TokenBucket { capacity, .. } => capacity as f64,
            _ => 0.0,
        };
        Self {
            policy,
            tokens,
            last_refill: Instant::now(),
        }
    }

    /// Block until the next call is allowed.
    pub fn wait(&mut self) {
        let delay = self.delay_for(Instant::now());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    /// How long the next call must wait, given the current time. Consumes
    /// one token for token-bucket policies.
    fn delay_for(&mut self, now: Instant) -> Duration {
        match self.policy {
            RatePolicy::None => Duration::ZERO,
            RatePolicy::FixedDelay(delay) => delay,
            RatePolicy::TokenBucket {
                capacity,
                refill_per_sec,
            } => {
                let elapsed = now.duration_since(self.last_refill).as_secs_f64();
                self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity as f64);
                self.last_refill = now;

                if self.tokens >= 1.0 {
                    self.tokens -= 1.0;
                    Duration::ZERO
                } else {
                    let wait = (1.0 - self.tokens) / refill_per_sec;
                    self.tokens = 0.0;
                    Duration::from_secs_f64(wait)
                }
            }
        }
    }
}

/// Per-instance client settings. Nothing here is process-global, so two
/// clients with different keys or pacing can coexist.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Strict mode turns HTTP error statuses into `ApiError::Status`
    /// instead of warn-and-return.
    pub strict: bool,
    pub rate_policy: RatePolicy,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 30,
            strict: false,
            rate_policy: RatePolicy::default(),
        }
    }
}

/// Blocking client for the property API.
pub struct Client {
    http: reqwest::blocking::Client,
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if config.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue one GET against an endpoint with an assembled query.
    ///
    /// The body is parsed as JSON regardless of the declared content type
    /// (the API occasionally mislabels it); a non-JSON declaration only
    /// warns. An HTTP error status warns and still returns the populated
    /// record unless the client is in strict mode.
    pub fn get(&self, endpoint: Endpoint, query: &QueryParams) -> Result<ApiResponse, ApiError> {
        let path = endpoint.path();
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, ACCEPT_JSON)
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(query.as_pairs())
            .send()?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(ct) = &content_type
            && !ct.contains("json")
        {
            eprintln!(
                "Warning: {} returned content type {:?}, parsing as JSON anyway",
                path, ct
            );
        }

        let text = response.text()?;
        let body = serde_json::from_str(&text).map_err(|source| ApiError::Json {
            path: path.clone(),
            source,
        })?;

        let record = ApiResponse {
            path,
            status,
            content_type,
            body,
        };

        if !record.is_success() {
            let message = record
                .error_message()
                .unwrap_or("no error message in body")
                .to_string();
            if self.config.strict {
                return Err(ApiError::Status {
                    status,
                    path: record.path,
                    message,
                });
            }
            eprintln!(
                "Warning: {} returned status {}: {}",
                record.path, status, message
            );
        }

        Ok(record)
    }

    /// Run one call per address spec, sequentially, pacing between calls
    /// per the configured rate policy.
    ///
    /// Returns one record per input item, in input order. In non-strict
    /// mode an HTTP error status on one item does not abort the rest; its
    /// record carries the failing status for the caller to inspect.
    pub fn fetch_batch(
        &self,
        endpoint: Endpoint,
        options: &QueryOptions,
        items: &[AddressSpec],
    ) -> Result<Vec<ApiResponse>, ApiError> {
        let base = build_query(endpoint, options);
        let mut limiter = RateLimiter::new(self.config.rate_policy.clone());
        let mut responses = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                limiter.wait();
            }
            let mut query = base.clone();
            item.apply_to(&mut query);
            responses.push(self.get(endpoint, &query)?);
        }

        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serve `count` canned HTTP responses on a local port, one connection
    /// each, and return the base URL to point a client at.
    fn spawn_canned_server(count: usize, status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for _ in 0..count {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        format!("http://{}", addr)
    }

    fn local_client(base_url: String, strict: bool) -> Client {
        let mut config = ClientConfig::new("test-key");
        config.base_url = base_url;
        config.strict = strict;
        config.rate_policy = RatePolicy::None;
        Client::new(config).unwrap()
    }

    #[test]
    fn test_default_policy_is_five_second_delay() {
        assert_eq!(
            RatePolicy::default(),
            RatePolicy::FixedDelay(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let mut limiter = RateLimiter::new(RatePolicy::FixedDelay(Duration::from_secs(5)));
        let now = Instant::now();
        assert_eq!(limiter.delay_for(now), Duration::from_secs(5));
        assert_eq!(limiter.delay_for(now), Duration::from_secs(5));
    }

    #[test]
    fn test_no_policy_never_waits() {
        let mut limiter = RateLimiter::new(RatePolicy::None);
        assert_eq!(limiter.delay_for(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_token_bucket_bursts_then_paces() {
        let mut limiter = RateLimiter::new(RatePolicy::TokenBucket {
            capacity: 2,
            refill_per_sec: 1.0,
        });
        let now = Instant::now();

        // Two free tokens, then a full one-second wait
        assert_eq!(limiter.delay_for(now), Duration::ZERO);
        assert_eq!(limiter.delay_for(now), Duration::ZERO);
        let wait = limiter.delay_for(now);
        assert!((wait.as_secs_f64() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_token_bucket_refills_up_to_capacity() {
        let mut limiter = RateLimiter::new(RatePolicy::TokenBucket {
            capacity: 2,
            refill_per_sec: 1.0,
        });
        let start = Instant::now();
        assert_eq!(limiter.delay_for(start), Duration::ZERO);
        assert_eq!(limiter.delay_for(start), Duration::ZERO);

        // Ten seconds later the bucket is full again, but no fuller than capacity
        let later = start + Duration::from_secs(10);
        assert_eq!(limiter.delay_for(later), Duration::ZERO);
        assert_eq!(limiter.delay_for(later), Duration::ZERO);
        assert!(limiter.delay_for(later) > Duration::ZERO);
    }

    #[test]
    fn test_batch_queries_merge_base_with_each_item() {
        // Mirrors the per-item assembly done by fetch_batch
        let base = build_query(Endpoint::Address, &QueryOptions::default());
        let items = [
            AddressSpec::OneLine {
                address: "4529 Winona Ct, Denver, CO".to_string(),
            },
            AddressSpec::TwoLine {
                address1: "1600 Pennsylvania Ave".to_string(),
                address2: "Washington, DC".to_string(),
            },
        ];

        let queries: Vec<QueryParams> = items
            .iter()
            .map(|item| {
                let mut query = base.clone();
                item.apply_to(&mut query);
                query
            })
            .collect();

        assert_eq!(queries.len(), items.len());
        assert_eq!(queries[0].get("address"), Some("4529 Winona Ct, Denver, CO"));
        assert_eq!(queries[0].get("radius"), Some("20"));
        assert_eq!(queries[1].get("address1"), Some("1600 Pennsylvania Ave"));
        assert_eq!(queries[1].get("address"), None);
    }

    #[test]
    fn test_batch_survives_http_error_status() {
        let body = r#"{"status":{"code":401,"msg":"Unauthorized"}}"#;
        let base_url = spawn_canned_server(2, "HTTP/1.1 401 Unauthorized", body);
        let client = local_client(base_url, false);

        let items = [
            AddressSpec::OneLine {
                address: "4529 Winona Ct, Denver, CO".to_string(),
            },
            AddressSpec::OneLine {
                address: "1600 Pennsylvania Ave, Washington, DC".to_string(),
            },
        ];

        let responses = client
            .fetch_batch(Endpoint::Address, &QueryOptions::default(), &items)
            .unwrap();

        // One record per item, each carrying the failing status
        assert_eq!(responses.len(), items.len());
        for response in &responses {
            assert_eq!(response.status, 401);
            assert!(!response.is_success());
            assert_eq!(response.error_message(), Some("Unauthorized"));
        }
    }

    #[test]
    fn test_strict_mode_promotes_error_status() {
        let body = r#"{"status":{"code":401,"msg":"Unauthorized"}}"#;
        let base_url = spawn_canned_server(1, "HTTP/1.1 401 Unauthorized", body);
        let client = local_client(base_url, true);

        let items = [AddressSpec::OneLine {
            address: "4529 Winona Ct, Denver, CO".to_string(),
        }];

        let result = client.fetch_batch(Endpoint::Address, &QueryOptions::default(), &items);
        match result {
            Err(ApiError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("expected status error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_successful_get_returns_parsed_body() {
        let body = r#"{"status":{"code":0,"msg":"SuccessWithResult"},"property":[{"identifier":{"obPropId":1234}}]}"#;
        let base_url = spawn_canned_server(1, "HTTP/1.1 200 OK", body);
        let client = local_client(base_url, true);

        let query = build_query(Endpoint::Detail, &QueryOptions::default());
        let response = client.get(Endpoint::Detail, &query).unwrap();

        assert!(response.is_success());
        assert_eq!(response.path, "/propertyapi/v1.0.0/property/detail");
        assert_eq!(
            response.content_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(
            response.body["property"][0]["identifier"]["obPropId"],
            serde_json::json!(1234)
        );
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = match Client::new(ClientConfig::new("")) {
            Err(e) => e,
            Ok(_) => panic!("expected an error for the empty API key"),
        };
        assert!(matches!(err, ApiError::MissingApiKey));
        assert_eq!(err.to_string(), "No API key provided");
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("k");
        assert_eq!(config.base_url, "https://api.gateway.attomdata.com");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.strict);
    }
}
