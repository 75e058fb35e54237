//! HTTP access to the search service under test.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, Url};

use crate::samples::Variant;

/// A captured response, status and body together, ready for validation.
#[derive(Debug)]
pub struct RawResponse {
    /// HTTP status code of the response.
    pub status: StatusCode,
    /// Full response body as text.
    pub body: String,
}

/// Client for the search service, with all endpoint URLs resolved up front.
#[derive(Debug, Clone)]
pub struct SearchRemote {
    customer_url: Url,
    event_url: Url,
    health_url: Url,
    client: Client,
}

impl SearchRemote {
    /// Creates a remote for the given base URL with a default client.
    ///
    /// Fails when the base URL does not parse; this happens during setup,
    /// before any load is generated.
    pub fn new(remote: &str) -> Result<Self> {
        let base: Url = remote
            .parse()
            .with_context(|| format!("invalid remote URL `{remote}`"))?;
        let join = |segment| {
            base.join(segment)
                .with_context(|| format!("cannot resolve `{segment}` against `{base}`"))
        };
        Ok(Self {
            customer_url: join(Variant::Customer.endpoint())?,
            event_url: join(Variant::Event.endpoint())?,
            health_url: join("healthz")?,
            client: Client::new(),
        })
    }

    /// Builds the search URL for one sampled query. The value is
    /// percent-encoded by the query-pair serializer, so decoding the URL
    /// reproduces it exactly.
    pub fn search_url(&self, variant: Variant, field: &str, value: &str) -> Url {
        let mut url = match variant {
            Variant::Customer => self.customer_url.clone(),
            Variant::Event => self.event_url.clone(),
        };
        url.query_pairs_mut().append_pair(field, value);
        url
    }

    /// Issues one search GET, capturing status and body.
    ///
    /// Transport errors surface as `Err`; any HTTP status is an `Ok` response
    /// and left to the caller's checks.
    pub async fn search(&self, url: Url) -> reqwest::Result<RawResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    /// Issues the one-shot `GET /healthz` probe.
    pub async fn healthz(&self) -> reqwest::Result<RawResponse> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_resolve_against_the_base() {
        let remote = SearchRemote::new("http://localhost:8080").unwrap();
        let url = remote.search_url(Variant::Customer, "email", "a@b.example");
        assert_eq!(url.path(), "/search_customers");
        let url = remote.search_url(Variant::Event, "call_id", "c1");
        assert_eq!(url.as_str(), "http://localhost:8080/search_events?call_id=c1");
    }

    #[test]
    fn query_value_round_trips_through_encoding() {
        let remote = SearchRemote::new("http://localhost:8080").unwrap();
        let value = "weird value+&=?#/100%ü";
        let url = remote.search_url(Variant::Customer, "email", value);

        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "email");
        assert_eq!(pairs[0].1, value);
    }

    #[test]
    fn bad_remote_is_a_setup_error() {
        assert!(SearchRemote::new("not a url").is_err());
    }
}
