use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::cache::{QueryCache, approximate_hash};
use crate::error::TaxonomyError;

pub const QLEVER_URL: &str = "https://qlever.cs.uni-freiburg.de/api/wikidata";

const QUERY_TIMEOUT: Duration = Duration::from_secs(70);
const RAW_TEXT_NAMESPACE: &str = "sparql_to_text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMethod {
    Get,
    Post,
}

pub trait SparqlClient: Send + Sync {
    fn query_text(
        &self,
        query: &str,
        endpoint: &str,
        method: QueryMethod,
    ) -> Result<String, TaxonomyError>;
}

#[derive(Clone)]
pub struct SparqlHttpClient {
    client: Client,
}

impl SparqlHttpClient {
    pub fn new() -> Result<Self, TaxonomyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lotus-taxo/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TaxonomyError::RemoteQueryFailed(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("text/csv"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|err| TaxonomyError::RemoteQueryFailed(err.to_string()))?;
        Ok(Self { client })
    }
}

impl SparqlClient for SparqlHttpClient {
    fn query_text(
        &self,
        query: &str,
        endpoint: &str,
        method: QueryMethod,
    ) -> Result<String, TaxonomyError> {
        let request = match method {
            QueryMethod::Get => self.client.get(endpoint).query(&[("query", query)]),
            QueryMethod::Post => self.client.post(endpoint).query(&[("query", query)]),
        };
        let response = request
            .send()
            .map_err(|err| TaxonomyError::RemoteQueryFailed(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "query request failed".to_string());
            return Err(TaxonomyError::QueryStatus { status, message });
        }
        response
            .text()
            .map_err(|err| TaxonomyError::RemoteQueryFailed(err.to_string()))
    }
}

/// Execute a query through the cache: a stored result younger than the cache
/// validity window is returned without touching the endpoint. Keys use the
/// approximate hash, so whitespace-variant copies of one query share a slot.
pub fn cached_query_text(
    cache: &QueryCache,
    client: &dyn SparqlClient,
    query: &str,
    endpoint: &str,
    method: QueryMethod,
) -> Result<String, TaxonomyError> {
    let key = approximate_hash(query);
    cache.fetch_or_compute(RAW_TEXT_NAMESPACE, &key, || {
        info!(endpoint, "issuing SPARQL query");
        client.query_text(query, endpoint, method)
    })
}
