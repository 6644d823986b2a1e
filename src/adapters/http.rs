use crate::domain::model::{Listing, SalaryRange, SearchQuery};
use crate::domain::ports::ListingSource;
use crate::utils::error::{FetchError, ListingFieldError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.adzuna.com/v1/api/jobs";
pub const DEFAULT_COUNTRY: &str = "pl";
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 50;
pub const MAX_PAGES: u32 = 5;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AdzunaSettings {
    pub endpoint: String,
    pub country: String,
    pub app_id: String,
    pub app_key: String,
    pub results_per_page: u32,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub page_delay: Duration,
}

impl std::fmt::Debug for AdzunaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdzunaSettings")
            .field("endpoint", &self.endpoint)
            .field("country", &self.country)
            .field("app_id", &self.app_id)
            .field("app_key", &"***")
            .field("results_per_page", &self.results_per_page)
            .field("max_pages", &self.max_pages)
            .field("request_timeout", &self.request_timeout)
            .field("page_delay", &self.page_delay)
            .finish()
    }
}

/// One page of the search response. Only `results` is mandatory.
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    count: Option<u64>,
    results: Vec<Value>,
}

/// Client for the Adzuna job search API.
pub struct AdzunaClient {
    settings: AdzunaSettings,
    client: Client,
}

impl AdzunaClient {
    pub fn new(settings: AdzunaSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { settings, client })
    }

    pub fn page_url(&self, page: u32, query: &SearchQuery) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/{}/search/{}",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.country,
            page
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("app_id", &self.settings.app_id)
                .append_pair("app_key", &self.settings.app_key)
                .append_pair("results_per_page", &self.settings.results_per_page.to_string())
                .append_pair("what", &query.terms);
            if let Some(location) = &query.location {
                pairs.append_pair("where", location);
            }
            if let Some(distance) = query.distance_km {
                pairs.append_pair("distance", &distance.to_string());
            }
            if query.title_only {
                pairs.append_pair("title_only", &query.terms);
            }
            pairs.append_pair("sort_by", "date");
        }

        Ok(url)
    }

    async fn fetch_page(&self, page: u32, query: &SearchQuery) -> Result<SearchPage, FetchError> {
        let url = self.page_url(page, query)?;
        // The query string carries the API key; only the path is logged.
        tracing::debug!("Requesting search page {} from {}", page, url.path());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;
        tracing::debug!("Search API response status: {}", response.status());

        let body = response.text().await.map_err(transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn collect_listings(page: u32, records: Vec<Value>, into: &mut Vec<Listing>) {
        for (index, record) in records.iter().enumerate() {
            match parse_listing(record) {
                Ok(listing) => into.push(listing),
                Err(e) => tracing::warn!(
                    "Skipping listing #{} on page {}: {}",
                    index + 1,
                    page,
                    e
                ),
            }
        }
    }
}

#[async_trait]
impl ListingSource for AdzunaClient {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Listing>, FetchError> {
        tracing::info!(
            "🔎 Searching for '{}' (location: {}, distance: {})",
            query.terms,
            query.location.as_deref().unwrap_or("any"),
            query
                .distance_km
                .map(|d| format!("{} km", d))
                .unwrap_or_else(|| "default".to_string())
        );

        let first = self.fetch_page(1, query).await?;
        let first_len = first.results.len() as u64;
        let total = first.count.unwrap_or(first_len);
        let per_page = u64::from(self.settings.results_per_page.max(1));
        let page_count = total.div_ceil(per_page);
        let last_page = page_count.min(u64::from(self.settings.max_pages)) as u32;

        let mut listings = Vec::new();
        Self::collect_listings(1, first.results, &mut listings);

        for page in 2..=last_page {
            tokio::time::sleep(self.settings.page_delay).await;
            match self.fetch_page(page, query).await {
                Ok(next) => Self::collect_listings(page, next.results, &mut listings),
                Err(e) => tracing::warn!("Skipping search page {}: {}", page, e),
            }
        }

        tracing::info!(
            "Retrieved {} listings from {} page(s), {} reported in total",
            listings.len(),
            last_page.max(1),
            total
        );
        Ok(listings)
    }
}

/// reqwest errors render the request URL, which carries `app_key`.
fn transport(e: reqwest::Error) -> FetchError {
    FetchError::Transport(e.without_url())
}

fn optional_str(record: &Value, field: &'static str) -> Result<Option<String>, ListingFieldError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ListingFieldError::WrongType { field }),
    }
}

fn display_name(record: &Value, field: &'static str) -> Option<String> {
    record
        .get(field)
        .and_then(|v| v.get("display_name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Converts one raw API record. `id` and `title` are required; everything
/// else falls back to `None`.
pub fn parse_listing(record: &Value) -> Result<Listing, ListingFieldError> {
    if !record.is_object() {
        return Err(ListingFieldError::NotAnObject);
    }

    let id = match record.get("id") {
        None | Some(Value::Null) => return Err(ListingFieldError::Missing { field: "id" }),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(ListingFieldError::WrongType { field: "id" }),
    };
    if id.contains(['\n', '\r']) {
        return Err(ListingFieldError::InvalidId { id });
    }

    let title =
        optional_str(record, "title")?.ok_or(ListingFieldError::Missing { field: "title" })?;

    let salary = match (
        record.get("salary_min").and_then(Value::as_f64),
        record.get("salary_max").and_then(Value::as_f64),
    ) {
        (Some(min), Some(max)) => Some(SalaryRange {
            min,
            max,
            currency: record
                .get("salary_currency")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        _ => None,
    };

    Ok(Listing {
        id,
        title,
        company: display_name(record, "company"),
        location: display_name(record, "location"),
        description: optional_str(record, "description")?,
        url: optional_str(record, "redirect_url")?,
        salary,
    })
}
