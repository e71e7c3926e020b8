//! Diário Oficial do Estado do Piauí (structured listing API).
//!
//! The listing endpoint backs a DataTables grid: a form-encoded POST
//! returns `{"data": [[link_html, description, "dd/mm/yyyy",
//! "dd/mm/yyyy HH:MM:SS", ...], ...]}`.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    filename_from_path, CandidateContent, FetchSelector, GazetteCandidate, HttpClient,
    ScraperError, SourceAdapter,
};
use crate::config::HttpConfig;
use crate::models::{KnownInstitution, NewGazette};

/// Publisher site root.
pub const BASE_URL: &str = "https://www.diario.pi.gov.br";

/// Listing endpoint, relative to [`BASE_URL`].
pub const LISTING_PATH: &str = "/doe/Api/listardiarios.json";

/// Rows requested per listing call.
pub const PAGE_SIZE: u32 = 50;

static PDF_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="(.+?\.pdf)""#).unwrap());

/// Listing response envelope.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub draw: i64,
    #[serde(default, rename = "recordsTotal")]
    pub records_total: i64,
    #[serde(default, rename = "recordsFiltered")]
    pub records_filtered: i64,
    pub data: Vec<Vec<serde_json::Value>>,
}

/// Encode the listing form for one day.
pub fn listing_form(date: NaiveDate) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("draw", "3");
    form.append_pair("start", "0");
    form.append_pair("length", &PAGE_SIZE.to_string());
    form.append_pair("filter_data", &date.format("%Y-%m-%d").to_string());

    for i in 0..=2 {
        let prefix = format!("columns[{}]", i);
        form.append_pair(&format!("{}[data]", prefix), &i.to_string());
        form.append_pair(&format!("{}[searchable]", prefix), "true");
        form.append_pair(&format!("{}[orderable]", prefix), "true");
        form.append_pair(&format!("{}[search][value]", prefix), "");
        form.append_pair(&format!("{}[search][regex]", prefix), "false");
    }
    form.append_pair("order[0][column]", "0");
    form.append_pair("order[0][dir]", "asc");
    form.append_pair("search[value]", "");
    form.append_pair("search[regex]", "false");
    form.append_pair("filter_numero", "");
    form.finish()
}

/// Parse a listing body into candidates.
///
/// Relative PDF links resolve against `base_url`. An unparsable body fails
/// the whole listing. Rows that are too short or carry no PDF link are
/// skipped; unparsable dates become `None`.
pub fn parse_listing(
    body: &str,
    key_date: NaiveDate,
    base_url: &str,
) -> Result<Vec<GazetteCandidate>, ScraperError> {
    let listing: ListingResponse =
        serde_json::from_str(body).map_err(|e| ScraperError::parse("listing JSON", e))?;

    debug!(
        "Listing returned {} row(s) ({} total)",
        listing.data.len(),
        listing.records_total
    );

    let mut candidates = Vec::with_capacity(listing.data.len());
    for (index, row) in listing.data.iter().enumerate() {
        if row.len() < 4 {
            warn!("Skipping listing row {}: only {} column(s)", index, row.len());
            continue;
        }

        let cell = |i: usize| row[i].as_str().unwrap_or_default();

        let Some(href) = PDF_HREF.captures(cell(0)).and_then(|c| c.get(1)) else {
            warn!("Skipping listing row {}: no PDF link", index);
            continue;
        };

        let description = cell(1).trim().to_string();
        let published_at = NaiveDate::parse_from_str(cell(2).trim(), "%d/%m/%Y")
            .ok()
            .and_then(NewGazette::date_to_utc);
        let last_modified_at =
            NaiveDateTime::parse_from_str(cell(3).trim(), "%d/%m/%Y %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc());

        let path = href.as_str().replace("..", "");
        let url = resolve_pdf_url(base_url, &path);
        let filename = filename_from_path(&path).unwrap_or("diario.pdf").to_string();

        candidates.push(GazetteCandidate {
            institution_id: KnownInstitution::GovernoPiaui.id(),
            description,
            published_at,
            last_modified_at,
            filename,
            content_type: "application/pdf".to_string(),
            key_date,
            content: CandidateContent::Remote { url },
        });
    }

    Ok(candidates)
}

fn resolve_pdf_url(base_url: &str, path: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

/// Structured-API adapter for the state gazette.
pub struct GovernoPiauiAdapter {
    listing_client: HttpClient,
    download_client: HttpClient,
    base_url: String,
}

impl GovernoPiauiAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self, ScraperError> {
        Self::with_base_url(http, BASE_URL)
    }

    /// Point the adapter at another host (mirrors, tests).
    pub fn with_base_url(http: &HttpConfig, base_url: &str) -> Result<Self, ScraperError> {
        let slug = KnownInstitution::GovernoPiaui.slug();
        let base_url = base_url.trim_end_matches('/').to_string();
        let user_agent = http.user_agent.as_deref();

        let listing_client =
            HttpClient::new(slug, Duration::from_secs(http.listing_timeout), user_agent)?
                .with_referer(format!("{}/doe/", base_url))
                .with_origin(base_url.clone())
                .with_header("x-requested-with", "XMLHttpRequest");
        let download_client = HttpClient::new(
            slug,
            Duration::from_secs(http.state_download_timeout),
            user_agent,
        )?
        .with_referer(format!("{}/doe/", base_url));

        Ok(Self {
            listing_client,
            download_client,
            base_url,
        })
    }
}

#[async_trait]
impl SourceAdapter for GovernoPiauiAdapter {
    fn slug(&self) -> &'static str {
        KnownInstitution::GovernoPiaui.slug()
    }

    async fn list(&self, selector: FetchSelector) -> Result<Vec<GazetteCandidate>, ScraperError> {
        let date = selector.date_or_today();
        let url = format!("{}{}", self.base_url, LISTING_PATH);
        info!("Listing {} gazettes for {}", self.slug(), date);

        let body = self
            .listing_client
            .post_form(&url, listing_form(date))
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_listing(&body, date, &self.base_url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        self.download_client.get_bytes(url).await
    }
}
