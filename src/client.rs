//! Blocking client for the Limitless lifelogs endpoint.
//!
//! The API is cursor-paginated: every response carries `meta.lifelogs.nextCursor`
//! which must be sent back as `cursor` to get the following page.
use crate::lifelog::Lifelog;
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.limitless.ai";
pub const LIFELOGS_ENDPOINT: &str = "v1/lifelogs";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error! Status: {status}")]
    Status { status: StatusCode },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            other => Err(format!("expected 'asc' or 'desc', got '{}'", other)),
        }
    }
}

/// Anything that can hand the exporter an ordered list of lifelogs.
pub trait LifelogSource {
    fn fetch(&self, direction: Direction, limit: Option<usize>)
    -> Result<Vec<Lifelog>, ClientError>;
}

/// One decoded page of the lifelogs endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    data: PageData,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageData {
    #[serde(default)]
    lifelogs: Vec<Lifelog>,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    lifelogs: CursorMeta,
}

#[derive(Debug, Default, Deserialize)]
struct CursorMeta {
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

impl Page {
    pub fn new(lifelogs: Vec<Lifelog>, next_cursor: Option<&str>) -> Self {
        Self {
            data: PageData { lifelogs },
            meta: PageMeta {
                lifelogs: CursorMeta {
                    next_cursor: next_cursor.map(str::to_string),
                },
            },
        }
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.meta
            .lifelogs
            .next_cursor
            .as_deref()
            .filter(|c| !c.is_empty())
    }
}

/// Drive `fetch_page` until the cursor runs out or `limit` lifelogs are collected.
///
/// `fetch_page` receives the cursor of the page to request (`None` for the first
/// one) and the page size to ask for.
pub fn collect_pages<F>(
    limit: Option<usize>,
    page_size: usize,
    mut fetch_page: F,
) -> Result<Vec<Lifelog>, ClientError>
where
    F: FnMut(Option<&str>, usize) -> Result<Page, ClientError>,
{
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let request_size = match limit {
            Some(limit) => page_size.min(limit.saturating_sub(all.len())),
            None => page_size,
        };
        if request_size == 0 {
            break;
        }

        let page = fetch_page(cursor.as_deref(), request_size)?;
        let next = page.next_cursor().map(str::to_string);
        let received = page.data.lifelogs.len();
        all.extend(page.data.lifelogs);
        log::debug!("Fetched {} lifelogs ({} total)", received, all.len());

        if let Some(limit) = limit
            && all.len() >= limit
        {
            all.truncate(limit);
            break;
        }
        match next {
            Some(c) if received > 0 => cursor = Some(c),
            _ => break,
        }
    }

    Ok(all)
}

pub struct Client {
    http: HttpClient,
    endpoint: Url,
    api_key: Option<String>,
    page_size: usize,
    timezone: Option<String>,
}

impl Client {
    pub fn new(api_url: &str, api_key: Option<String>) -> Result<Self, ClientError> {
        let base = Url::parse(api_url).map_err(|source| ClientError::InvalidUrl {
            url: api_url.to_string(),
            source,
        })?;
        let endpoint = base
            .join(LIFELOGS_ENDPOINT)
            .map_err(|source| ClientError::InvalidUrl {
                url: api_url.to_string(),
                source,
            })?;
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|source| ClientError::Transport {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            page_size: DEFAULT_PAGE_SIZE,
            timezone: None,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// IANA timezone the API should use when rendering times in its responses.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn api_key(&self) -> Result<&str, ClientError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ClientError::Authentication(
                    "no API key configured; set LIMITLESS_API_KEY".to_string(),
                )
            })
    }

    fn query(&self, direction: Direction, cursor: Option<&str>, size: usize) -> Vec<(&str, String)> {
        let mut query = vec![
            ("limit", size.to_string()),
            ("direction", direction.as_str().to_string()),
            ("includeMarkdown", "true".to_string()),
            ("includeHeadings", "false".to_string()),
        ];
        if let Some(tz) = &self.timezone {
            query.push(("timezone", tz.clone()));
        }
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        query
    }

    fn fetch_page(
        &self,
        api_key: &str,
        direction: Direction,
        cursor: Option<&str>,
        size: usize,
    ) -> Result<Page, ClientError> {
        log::debug!(
            "GET {} (limit={}, cursor={})",
            self.endpoint,
            size,
            cursor.unwrap_or("-")
        );
        let response = self
            .http
            .get(self.endpoint.clone())
            .header("X-API-Key", api_key)
            .query(&self.query(direction, cursor, size))
            .send()
            .map_err(|source| ClientError::Transport {
                url: self.endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Authentication(format!(
                "API rejected the key ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(ClientError::Status { status });
        }

        let body = response.text().map_err(|source| ClientError::Transport {
            url: self.endpoint.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl LifelogSource for Client {
    fn fetch(
        &self,
        direction: Direction,
        limit: Option<usize>,
    ) -> Result<Vec<Lifelog>, ClientError> {
        let api_key = self.api_key()?;
        collect_pages(limit, self.page_size, |cursor, size| {
            self.fetch_page(api_key, direction, cursor, size)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_at(ts: &str) -> Lifelog {
        Lifelog::new(Some(ts), Some(ts))
    }

    fn pages() -> Vec<Page> {
        vec![
            Page::new(vec![log_at("a"), log_at("b")], Some("c1")),
            Page::new(vec![log_at("c"), log_at("d")], Some("c2")),
            Page::new(vec![log_at("e")], None),
        ]
    }

    #[test]
    fn follows_cursor_until_exhausted() {
        let mut pages = pages().into_iter();
        let mut seen_cursors = Vec::new();
        let all = collect_pages(None, 2, |cursor, size| {
            assert_eq!(size, 2);
            seen_cursors.push(cursor.map(str::to_string));
            Ok(pages.next().unwrap())
        })
        .unwrap();

        let order: Vec<&str> = all.iter().map(|l| l.markdown()).collect();
        assert_eq!(order, ["a", "b", "c", "d", "e"]);
        assert_eq!(
            seen_cursors,
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[test]
    fn stops_and_truncates_at_limit() {
        let mut pages = pages().into_iter();
        let mut sizes = Vec::new();
        let all = collect_pages(Some(3), 2, |_, size| {
            sizes.push(size);
            Ok(pages.next().unwrap())
        })
        .unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn zero_limit_makes_no_requests() {
        let all = collect_pages(Some(0), 10, |_, _| panic!("should not fetch")).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn empty_page_ends_paging_even_with_cursor() {
        let mut calls = 0;
        let all = collect_pages(None, 10, |_, _| {
            calls += 1;
            Ok(Page::new(Vec::new(), Some("again")))
        })
        .unwrap();
        assert!(all.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn page_error_is_propagated() {
        let mut calls = 0;
        let err = collect_pages(None, 10, |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(Page::new(vec![log_at("a")], Some("next")))
            } else {
                Err(ClientError::Status {
                    status: StatusCode::BAD_GATEWAY,
                })
            }
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Status { .. }));
        assert_eq!(err.to_string(), "HTTP error! Status: 502 Bad Gateway");
    }

    #[test]
    fn decodes_api_page() {
        let body = r#"{
            "data": {"lifelogs": [
                {"id": "1", "startTime": "2025-03-18T15:41:44-05:00", "markdown": "Hello"},
                {"id": "2", "markdown": "No time"}
            ]},
            "meta": {"lifelogs": {"nextCursor": "abc", "count": 2}}
        }"#;
        let page: Page = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_cursor(), Some("abc"));
        assert_eq!(page.data.lifelogs.len(), 2);
        assert_eq!(page.data.lifelogs[1].start_time(), None);
    }

    #[test]
    fn odd_field_types_do_not_lose_the_page() {
        let body = r#"{
            "data": {"lifelogs": [
                {"startTime": "2025-03-18T15:41:44-05:00", "markdown": "ok"},
                {"startTime": 1742330504, "markdown": 42}
            ]},
            "meta": {"lifelogs": {"nextCursor": null}}
        }"#;
        let page: Page = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.lifelogs.len(), 2);
        assert_eq!(page.data.lifelogs[1].start_time(), Some("1742330504"));
        assert_eq!(page.data.lifelogs[1].markdown(), "42");
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn decodes_final_page_without_meta() {
        let page: Page = serde_json::from_str(r#"{"data": {"lifelogs": []}}"#).unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: Page =
            serde_json::from_str(r#"{"meta": {"lifelogs": {"nextCursor": ""}}}"#).unwrap();
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let client = Client::new(DEFAULT_API_URL, None).unwrap();
        let err = client.fetch(Direction::Asc, None).unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));

        let client = Client::new(DEFAULT_API_URL, Some("  ".to_string())).unwrap();
        let err = client.fetch(Direction::Asc, Some(5)).unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
    }

    #[test]
    fn builds_endpoint_and_query() {
        let client = Client::new("https://example.test/", Some("k".to_string()))
            .unwrap()
            .with_timezone("America/Chicago");
        assert_eq!(client.endpoint().as_str(), "https://example.test/v1/lifelogs");

        let query = client.query(Direction::Desc, Some("cur"), 7);
        assert!(query.contains(&("limit", "7".to_string())));
        assert!(query.contains(&("direction", "desc".to_string())));
        assert!(query.contains(&("includeMarkdown", "true".to_string())));
        assert!(query.contains(&("timezone", "America/Chicago".to_string())));
        assert!(query.contains(&("cursor", "cur".to_string())));
    }

    #[test]
    fn rejects_invalid_api_url() {
        let err = Client::new("not a url", None).err().unwrap();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn parses_direction() {
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::default().to_string(), "asc");
    }
}
