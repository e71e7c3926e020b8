//! Diário Oficial dos Municípios do Piauí (browser-rendered current edition).
//!
//! The edition page fills its heading and download link from JavaScript,
//! so it is rendered in a headless browser. The PDF itself is fetched with
//! a plain HTTP client once the link is known.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use super::{
    resolve_user_agent, BrowserEngineConfig, BrowserFetcher, CandidateContent, FetchSelector,
    GazetteCandidate, HttpClient, ScraperError, SourceAdapter,
};
use crate::config::HttpConfig;
use crate::models::{KnownInstitution, NewGazette};

/// Page that always shows the latest edition.
pub const EDITION_PAGE_URL: &str = "https://www.diarioficialdosmunicipios.org/edicao_atual.html";

/// Heading holding "Edição <n>, <dd/mm/yyyy>".
pub const EDITION_HEADING_SELECTOR: &str = "span#newDesc > h1";

/// Visible text of the download anchor.
pub const DOWNLOAD_LINK_TEXT: &str = "Baixar Edição";

static EDITION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Edição\s+(\d+),\s+(\d{2}/\d{2}/\d{4})").unwrap());

/// Edition details scraped from the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionInfo {
    pub number: u32,
    /// Date exactly as printed (`dd/mm/yyyy`).
    pub date_text: String,
    pub published_on: Option<NaiveDate>,
    pub download_url: String,
}

impl EditionInfo {
    /// Natural key for the edition, e.g. `Edição 5302 (16/04/2025)`.
    pub fn description(&self) -> String {
        format!("Edição {} ({})", self.number, self.date_text)
    }

    /// Artifact filename, e.g. `edicao_5302_2025-04-16.pdf`.
    pub fn filename(&self) -> String {
        let date = match self.published_on {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => self.date_text.replace('/', "-"),
        };
        format!("edicao_{}_{}.pdf", self.number, date)
    }

    pub fn into_candidate(self) -> GazetteCandidate {
        GazetteCandidate {
            institution_id: KnownInstitution::MunicipiosPiaui.id(),
            description: self.description(),
            published_at: self.published_on.and_then(NewGazette::date_to_utc),
            last_modified_at: Some(chrono::Utc::now()),
            filename: self.filename(),
            content_type: "application/pdf".to_string(),
            key_date: self
                .published_on
                .unwrap_or_else(|| Local::now().date_naive()),
            content: CandidateContent::Remote {
                url: self.download_url,
            },
        }
    }
}

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::parse("CSS selector", e))
}

/// Extract edition number, date and download link from the rendered page.
///
/// There is exactly one edition per page, so any missing piece fails the
/// whole parse.
pub fn parse_edition_page(html: &str, page_url: &str) -> Result<EditionInfo, ScraperError> {
    let document = Html::parse_document(html);

    let heading = document
        .select(&selector(EDITION_HEADING_SELECTOR)?)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let caps = EDITION_PATTERN.captures(&heading).ok_or_else(|| {
        ScraperError::parse(
            "edition heading",
            format!("no edition number and date in {:?}", heading.trim()),
        )
    })?;
    let number: u32 = caps[1]
        .parse()
        .map_err(|e| ScraperError::parse("edition number", e))?;
    let date_text = caps[2].to_string();
    let published_on = NaiveDate::parse_from_str(&date_text, "%d/%m/%Y").ok();

    let href = document
        .select(&selector("a[href]")?)
        .find(|a| a.text().collect::<String>().contains(DOWNLOAD_LINK_TEXT))
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or_else(|| ScraperError::MissingLink(page_url.to_string()))?;

    let download_url = Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map_err(|e| ScraperError::parse("download link", e))?
        .to_string();

    Ok(EditionInfo {
        number,
        date_text,
        published_on,
        download_url,
    })
}

/// Browser-rendered adapter for the municipal association gazette.
pub struct MunicipiosPiauiAdapter {
    browser_config: BrowserEngineConfig,
    download_client: HttpClient,
    page_url: String,
    user_agent: String,
}

impl MunicipiosPiauiAdapter {
    pub fn new(http: &HttpConfig, browser_config: BrowserEngineConfig) -> Result<Self, ScraperError> {
        let user_agent = resolve_user_agent(http.user_agent.as_deref());
        // The host's certificate chain does not validate
        let download_client = HttpClient::with_invalid_certs(
            KnownInstitution::MunicipiosPiaui.slug(),
            Duration::from_secs(http.municipal_download_timeout),
            Some(&user_agent),
        )?;

        Ok(Self {
            browser_config,
            download_client,
            page_url: EDITION_PAGE_URL.to_string(),
            user_agent,
        })
    }
}

#[async_trait]
impl SourceAdapter for MunicipiosPiauiAdapter {
    fn slug(&self) -> &'static str {
        KnownInstitution::MunicipiosPiaui.slug()
    }

    async fn list(&self, selector: FetchSelector) -> Result<Vec<GazetteCandidate>, ScraperError> {
        if selector != FetchSelector::CurrentEdition {
            return Err(ScraperError::UnsupportedSelector {
                slug: self.slug(),
                selector,
            });
        }

        let mut fetcher = BrowserFetcher::new(self.browser_config.clone());
        let rendered = fetcher
            .render(
                &self.page_url,
                &self.user_agent,
                Some(EDITION_HEADING_SELECTOR),
            )
            .await;
        fetcher.close().await;
        let page = rendered?;

        let edition = parse_edition_page(&page.content, &page.final_url)?;
        info!(
            "Current {} edition: {} -> {}",
            self.slug(),
            edition.description(),
            edition.download_url
        );

        Ok(vec![edition.into_candidate()])
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        self.download_client
            .get_with_referer(url, &self.page_url)
            .await?
            .error_for_status()?
            .bytes()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="topo"><a href="/index.html">Início</a></div>
          <span id="newDesc"><h1>Edição 5302, 16/04/2025</h1></span>
          <div class="acoes">
            <a href="/visualizar/5302">Visualizar</a>
            <a class="btn" href="arquivos/2025/04/DM5302.pdf"><i class="icon"></i> Baixar Edição</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_edition_page() {
        let edition = parse_edition_page(PAGE, EDITION_PAGE_URL).unwrap();
        assert_eq!(edition.number, 5302);
        assert_eq!(edition.date_text, "16/04/2025");
        assert_eq!(edition.published_on, NaiveDate::from_ymd_opt(2025, 4, 16));
        assert_eq!(
            edition.download_url,
            "https://www.diarioficialdosmunicipios.org/arquivos/2025/04/DM5302.pdf"
        );
        assert_eq!(edition.description(), "Edição 5302 (16/04/2025)");
        assert_eq!(edition.filename(), "edicao_5302_2025-04-16.pdf");
    }

    #[test]
    fn test_candidate_from_edition() {
        let candidate = parse_edition_page(PAGE, EDITION_PAGE_URL)
            .unwrap()
            .into_candidate();
        assert_eq!(candidate.institution_id, 2);
        assert_eq!(candidate.key_date, NaiveDate::from_ymd_opt(2025, 4, 16).unwrap());
        assert!(candidate.published_at.is_some());
        assert!(candidate.last_modified_at.is_some());
    }

    #[test]
    fn test_missing_heading_fails() {
        let html = r#"<span id="newDesc"><h1>Carregando...</h1></span>
                      <a href="x.pdf">Baixar Edição</a>"#;
        let err = parse_edition_page(html, EDITION_PAGE_URL).unwrap_err();
        assert!(matches!(err, ScraperError::Parse { .. }));
    }

    #[test]
    fn test_missing_download_link_fails() {
        let html = r#"<span id="newDesc"><h1>Edição 12, 01/02/2025</h1></span>
                      <a href="x.pdf">Visualizar</a>"#;
        let err = parse_edition_page(html, EDITION_PAGE_URL).unwrap_err();
        assert!(matches!(err, ScraperError::MissingLink(_)));
    }

    #[test]
    fn test_absolute_link_kept() {
        let html = r#"<span id="newDesc"><h1>Edição 7, 31/12/2024</h1></span>
                      <a href="https://cdn.example.org/DM7.pdf">Baixar Edição</a>"#;
        let edition = parse_edition_page(html, EDITION_PAGE_URL).unwrap();
        assert_eq!(edition.download_url, "https://cdn.example.org/DM7.pdf");
    }
}
