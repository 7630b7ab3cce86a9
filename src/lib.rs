//! This library can be used to get sales tax rates for US addresses! Meant to be super simple.
//!
//! It gets data from the [Zip-Tax](https://zip-tax.com) `v50` JSON API. You need an API key
//! from them, which you pass in yourself, nothing is read from the environment.
//!
//! Note that this needs [`tokio`](https://crates.io/crates/tokio), as [`reqwest`](https://crates.io/crates/reqwest) needs `tokio`!
//!
//! ```no_run
//! # async fn run() -> Result<(), ziptax::LookupError> {
//! let info = ziptax::fetch_sales_tax("200 Spectrum Center Dr, Irvine, CA 92618", "your_api_key_here").await?;
//! println!("{:?}", info.sales_tax_rate());
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

mod response;
mod transport;

pub use crate::response::{
    format_rate, AddressDetail, Coordinate, LookupResponse, Summary, SummaryError, TaxResult,
};
pub use crate::transport::Transport;

use reqwest::StatusCode;
use std::fmt::Display;
use std::time::Duration;
use url::form_urlencoded;

const ZIPTAX_ADDR_PREFIX: &str = "https://api.zip-tax.com/request/v50";

/// Everything the client needs from you. There is no default key and no default timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    /// Give up on a request after this long. `None` waits as long as the transport does.
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One lookup. Neither field is checked locally, zip-tax gets to decide what's valid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupRequest {
    pub address: String,
    pub api_key: String,
}

impl LookupRequest {
    pub fn new(address: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            api_key: api_key.into(),
        }
    }

    /// The key goes in as is, the address gets form-urlencoded.
    pub fn url(&self) -> String {
        let address: String = form_urlencoded::byte_serialize(self.address.as_bytes()).collect();
        format!(
            "{}?key={}&address={}",
            ZIPTAX_ADDR_PREFIX, self.api_key, address
        )
    }
}

/// Error fetching sales tax. Bad status codes, network trouble and unreadable bodies all end
/// up here; `status` is only set for the first.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
    status: Option<StatusCode>,
    message: String,
}

impl LookupError {
    fn transport<E: Display>(err: E) -> Self {
        Self {
            status: None,
            message: format!("Failed to make API request: {}", err),
        }
    }

    fn timed_out(after: Duration) -> Self {
        Self {
            status: None,
            message: format!("Request timed out after {:?}", after),
        }
    }

    fn unexpected_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            message: format!("Unexpected status code: {}", status.as_u16()),
        }
    }

    fn parse(err: serde_json::Error) -> Self {
        Self {
            status: None,
            message: format!("Failed to parse response: {}", err),
        }
    }

    /// The status zip-tax answered with, when that was the problem
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Talks to zip-tax. Holds no state besides its config, so calls don't affect each other.
#[derive(Debug, Clone)]
pub struct Client<T = reqwest::Client> {
    transport: T,
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self::with_transport(reqwest::Client::new(), config)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One GET, no retries. Anything but a 200 is an error.
    pub async fn fetch_sales_tax(&self, address: &str) -> Result<LookupResponse, LookupError> {
        let request = LookupRequest::new(address, self.config.api_key.as_str());
        let url = request.url();

        debug!("GET from zip-tax for address {:?}", request.address);
        let sent = self.transport.get(&url);
        let (status, body) = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, sent)
                .await
                .map_err(|_| LookupError::timed_out(limit))?,
            None => sent.await,
        }
        .map_err(LookupError::transport)?;

        debug!("zip-tax answered {} with {} bytes", status, body.len());
        if status != StatusCode::OK {
            return Err(LookupError::unexpected_status(status));
        }

        serde_json::from_str(&body).map_err(LookupError::parse)
    }
}

/// No retries, just one attempt, no timeout, nothing
pub async fn fetch_sales_tax(address: &str, api_key: &str) -> Result<LookupResponse, LookupError> {
    Client::new(Config::new(api_key))
        .fetch_sales_tax(address)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use url::Url;

    const IRVINE: &str = r#"{"addressDetail":{"normalizedAddress":"200 SPECTRUM CENTER DR, IRVINE, CA 92618","geoLat":33.6603,"geoLng":-117.7421},"results":[{"taxSales":0.0775}]}"#;

    struct Stub {
        reply: Result<(StatusCode, &'static str), &'static str>,
        delay: Option<Duration>,
        urls: Mutex<Vec<String>>,
    }

    impl Stub {
        fn answering(status: StatusCode, body: &'static str) -> Self {
            Self {
                reply: Ok((status, body)),
                delay: None,
                urls: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: &'static str) -> Self {
            Self {
                reply: Err(err),
                delay: None,
                urls: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Stub {
        type Error = String;

        async fn get(&self, url: &str) -> Result<(StatusCode, String), String> {
            self.urls.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply
                .map(|(status, body)| (status, body.to_string()))
                .map_err(str::to_string)
        }
    }

    fn client(stub: Stub) -> Client<Stub> {
        Client::with_transport(stub, Config::new("abc123"))
    }

    fn address_param(url: &str) -> String {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "address")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn url_template() {
        let request = LookupRequest::new("200 Spectrum Center Dr, Irvine, CA 92618", "abc123");
        assert_eq!(
            request.url(),
            "https://api.zip-tax.com/request/v50?key=abc123&address=200+Spectrum+Center+Dr%2C+Irvine%2C+CA+92618"
        );
    }

    #[test]
    fn addresses_survive_the_query_string() {
        for address in &[
            "200 Spectrum Center Dr, Irvine, CA 92618",
            "1 Main St #4 & Co, Springfield",
            "50% off 1+1 Rd?x=y",
            "Straße 5, München",
        ] {
            let url = LookupRequest::new(*address, "k").url();
            assert_eq!(url.matches('&').count(), 1, "{}", url);
            assert!(!url.contains('#'), "{}", url);
            assert_eq!(address_param(&url), *address);
        }
    }

    #[tokio::test]
    async fn ok_body_comes_back_as_is() {
        let client = client(Stub::answering(StatusCode::OK, IRVINE));
        let info = client.fetch_sales_tax("200 Spectrum Center Dr, Irvine, CA 92618").await.unwrap();

        let original: serde_json::Value = serde_json::from_str(IRVINE).unwrap();
        assert_eq!(serde_json::to_value(&info).unwrap(), original);
        assert!(info.summary().unwrap().to_string().ends_with("Rate: 7.75%"));

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("https://api.zip-tax.com/request/v50?key=abc123&address="));
        assert_eq!(address_param(&requests[0]), "200 Spectrum Center Dr, Irvine, CA 92618");
    }

    #[tokio::test]
    async fn not_found() {
        let client = client(Stub::answering(StatusCode::NOT_FOUND, "not json at all"));
        let err = client.fetch_sales_tax("nowhere").await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("404"), "{}", err);
    }

    #[tokio::test]
    async fn other_non_200s_are_errors_too() {
        for status in &[StatusCode::CREATED, StatusCode::NO_CONTENT, StatusCode::INTERNAL_SERVER_ERROR] {
            let client = client(Stub::answering(*status, IRVINE));
            let err = client.fetch_sales_tax("x").await.unwrap_err();
            assert_eq!(err.status(), Some(*status));
            assert_eq!(err.message(), format!("Unexpected status code: {}", status.as_u16()));
        }
    }

    #[tokio::test]
    async fn transport_failure_keeps_its_message() {
        let client = client(Stub::failing("ECONNRESET"));
        let err = client.fetch_sales_tax("x").await.unwrap_err();

        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("ECONNRESET"), "{}", err);
    }

    #[tokio::test]
    async fn garbage_body() {
        let client = client(Stub::answering(StatusCode::OK, "<html>oops</html>"));
        let err = client.fetch_sales_tax("x").await.unwrap_err();

        assert_eq!(err.status(), None);
        assert!(err.message().starts_with("Failed to parse response: "), "{}", err);
    }

    #[tokio::test]
    async fn fields_of_unexpected_types_pass_through() {
        const ODD: &str = r#"{"version":null,"rCode":"100","addressDetail":{"normalizedAddress":"X","incorporated":true,"geoLat":1.5,"geoLng":2.5},"results":[{"taxSales":0,"cityTaxCode":123}]}"#;
        let client = client(Stub::answering(StatusCode::OK, ODD));
        let info = client.fetch_sales_tax("x").await.unwrap();

        let original: serde_json::Value = serde_json::from_str(ODD).unwrap();
        assert_eq!(serde_json::to_value(&info).unwrap(), original);
        assert_eq!(info.into_body(), original);
    }

    #[tokio::test]
    async fn missing_results_is_not_the_clients_problem() {
        let body = r#"{"addressDetail":{"normalizedAddress":"X","geoLat":1.5,"geoLng":2.5}}"#;
        let client = client(Stub::answering(StatusCode::OK, body));
        let info = client.fetch_sales_tax("x").await.unwrap();

        assert!(info.results().is_none());
        assert_eq!(info.summary(), Err(SummaryError::NoResults));
    }

    #[tokio::test]
    async fn same_input_same_output() {
        let client = client(Stub::answering(StatusCode::OK, IRVINE));
        let first = client.fetch_sales_tax("200 Spectrum Center Dr").await.unwrap();
        let second = client.fetch_sales_tax("200 Spectrum Center Dr").await.unwrap();

        assert_eq!(first, second);
        let requests = client.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn timeout_when_asked_for() {
        let stub = Stub {
            delay: Some(Duration::from_secs(5)),
            ..Stub::answering(StatusCode::OK, IRVINE)
        };
        let config = Config::new("abc123").with_timeout(Duration::from_millis(20));
        let client = Client::with_transport(stub, config);
        let err = client.fetch_sales_tax("x").await.unwrap_err();

        assert_eq!(err.status(), None);
        assert!(err.message().starts_with("Request timed out after"), "{}", err);
    }

    #[test]
    fn config_defaults() {
        let config = Config::new("k");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.timeout, None);
        assert_eq!(Client::new(config.clone()).config(), &config);
    }
}
