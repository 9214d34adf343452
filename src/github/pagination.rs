// Link-header pagination.
// Follows rel="next" cursors sequentially and accumulates page items.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DashError, Result};

use super::client::GitHubClient;

/// Items requested per page; a shorter page is the last one.
pub const PER_PAGE: usize = 100;

/// Hard cap on pages fetched for one listing.
pub const MAX_PAGES: usize = 10;

/// Items accumulated across pages, plus the error that stopped the walk early.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub error: Option<DashError>,
}

impl<T> Paged<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            error: None,
        }
    }

    /// Some pages arrived before a later page failed.
    pub fn is_partial(&self) -> bool {
        self.error.is_some() && !self.items.is_empty()
    }

    /// Fail only when the walk produced nothing; partial results stay `Ok`.
    pub fn into_result(mut self) -> Result<Self> {
        if self.items.is_empty() {
            if let Some(err) = self.error.take() {
                return Err(err);
            }
        }
        Ok(self)
    }

    /// Keep only items matching `predicate`.
    pub fn retain(mut self, predicate: impl FnMut(&T) -> bool) -> Self {
        self.items.retain(predicate);
        self
    }
}

impl Paged<Value> {
    /// Decode every accumulated item into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Paged<T>> {
        let items = self
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;

        Ok(Paged {
            items,
            pages: self.pages,
            error: self.error,
        })
    }
}

/// Extract the `rel="next"` URL from a `Link` header.
///
/// Format: `<url>; rel="next", <url>; rel="last"`.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|link| {
        let mut parts = link.trim().split(';');
        let url = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });

        is_next.then(|| url.trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

/// Items carried by one page body.
#[derive(Debug, Clone, PartialEq)]
pub struct PageItems {
    pub items: Vec<Value>,
    /// The body was an array or a `workflow_runs` envelope, so a short page
    /// means the listing is exhausted.
    pub is_list: bool,
}

/// Split a page body into items.
///
/// Plain arrays are used as-is, `{workflow_runs: [...]}` envelopes are
/// unwrapped, and any other value counts as a single item.
pub fn page_items(body: Value) -> PageItems {
    let list = |items| PageItems {
        items,
        is_list: true,
    };
    let single = |item| PageItems {
        items: vec![item],
        is_list: false,
    };

    match body {
        Value::Array(items) => list(items),
        Value::Object(mut map) => match map.remove("workflow_runs") {
            Some(Value::Array(runs)) => list(runs),
            Some(other) => {
                map.insert("workflow_runs".to_string(), other);
                single(Value::Object(map))
            }
            None => single(Value::Object(map)),
        },
        other => single(other),
    }
}

impl GitHubClient {
    /// Fetch `url` and every following page, sequentially.
    ///
    /// Stops when there is no next link, a list page is shorter than
    /// [`PER_PAGE`], or [`MAX_PAGES`] pages were fetched. A failing page ends the walk and
    /// is reported in [`Paged::error`] next to the items gathered so far.
    pub async fn get_all_pages(&self, url: &str) -> Paged<Value> {
        let mut paged = Paged::empty();
        let mut next = Some(url.to_string());

        while let Some(url) = next.take() {
            if paged.pages >= MAX_PAGES {
                debug!(max_pages = MAX_PAGES, "Page cap reached");
                break;
            }

            debug!(page = paged.pages + 1, url = %url, "Fetching page");
            match self.get_page(&url).await {
                Ok(page) => {
                    let PageItems { items, is_list } = page_items(page.body);
                    let count = items.len();
                    paged.items.extend(items);
                    paged.pages += 1;

                    if is_list && count < PER_PAGE {
                        break;
                    }
                    next = page.next;
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        fetched = paged.items.len(),
                        error = %e,
                        "Pagination stopped early"
                    );
                    paged.error = Some(e);
                    break;
                }
            }
        }

        debug!(
            items = paged.items.len(),
            pages = paged.pages,
            "Finished paginated fetch"
        );
        paged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn numbered(range: std::ops::Range<u64>) -> Value {
        Value::Array(range.map(|id| json!({ "id": id })).collect())
    }

    fn ids(items: &[Value]) -> Vec<u64> {
        items.iter().map(|v| v["id"].as_u64().unwrap()).collect()
    }

    fn anonymous_client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(server.uri(), Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn test_next_page_url() {
        let header = r#"<https://api.github.com/repositories/1/pulls?page=2>; rel="next", <https://api.github.com/repositories/1/pulls?page=5>; rel="last""#;
        assert_eq!(
            next_page_url(header),
            Some("https://api.github.com/repositories/1/pulls?page=2".to_string())
        );

        let last_page = r#"<https://api.github.com/x?page=1>; rel="first", <https://api.github.com/x?page=4>; rel="prev""#;
        assert_eq!(next_page_url(last_page), None);
        assert_eq!(next_page_url(""), None);
    }

    #[test]
    fn test_page_items_envelopes() {
        let array = page_items(json!([1, 2]));
        assert_eq!(array.items.len(), 2);
        assert!(array.is_list);

        let runs = page_items(json!({ "total_count": 2, "workflow_runs": [{ "id": 1 }, { "id": 2 }] }));
        assert_eq!(runs.items, vec![json!({ "id": 1 }), json!({ "id": 2 })]);
        assert!(runs.is_list);

        let object = page_items(json!({ "id": 3 }));
        assert_eq!(object.items, vec![json!({ "id": 3 })]);
        assert!(!object.is_list);
    }

    #[test]
    fn test_into_result_keeps_partial() {
        let partial = Paged {
            items: vec![1],
            pages: 1,
            error: Some(DashError::Other("boom".to_string())),
        };
        assert!(partial.is_partial());
        assert!(partial.into_result().is_ok());

        let failed: Paged<u32> = Paged {
            items: Vec::new(),
            pages: 0,
            error: Some(DashError::Other("boom".to_string())),
        };
        assert!(failed.into_result().is_err());
    }

    #[tokio::test]
    async fn test_follows_links_in_order() {
        let server = MockServer::start().await;
        let base = format!("{}/repos/o/r/pulls", server.uri());

        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(numbered(100..130)))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(numbered(0..100))
                    .insert_header("link", format!(r#"<{}?page=2>; rel="next""#, base).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = anonymous_client(&server);
        let paged = client.get_all_pages(&base).await;

        assert!(paged.error.is_none());
        assert_eq!(paged.pages, 2);
        assert_eq!(ids(&paged.items), (0..130).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_paged_order_matches_single_fetch() {
        let paged_server = MockServer::start().await;
        let paged_base = format!("{}/items", paged_server.uri());
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(numbered(100..120)))
            .with_priority(1)
            .mount(&paged_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(numbered(0..100))
                    .insert_header(
                        "link",
                        format!(r#"<{}?page=2>; rel="next""#, paged_base).as_str(),
                    ),
            )
            .mount(&paged_server)
            .await;

        let single_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(numbered(0..120)))
            .mount(&single_server)
            .await;

        let paged = anonymous_client(&paged_server)
            .get_all_pages(&paged_base)
            .await;
        let single = anonymous_client(&single_server)
            .get_all_pages(&format!("{}/items", single_server.uri()))
            .await;

        assert_eq!(paged.items, single.items);
    }

    #[tokio::test]
    async fn test_short_page_stops_even_with_next_link() {
        let server = MockServer::start().await;
        let base = format!("{}/repos/o/r/issues", server.uri());
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(numbered(0..3))
                    .insert_header("link", format!(r#"<{}?page=2>; rel="next""#, base).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let paged = anonymous_client(&server).get_all_pages(&base).await;
        assert_eq!(paged.pages, 1);
        assert_eq!(paged.items.len(), 3);
    }

    #[tokio::test]
    async fn test_single_object_pages_follow_next_link() {
        let server = MockServer::start().await;
        let base = format!("{}/user", server.uri());
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 2 })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 1 }))
                    .insert_header("link", format!(r#"<{}?page=2>; rel="next""#, base).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let paged = anonymous_client(&server).get_all_pages(&base).await;
        assert_eq!(paged.pages, 2);
        assert_eq!(ids(&paged.items), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_page_cap() {
        let server = MockServer::start().await;
        let base = format!("{}/repos/o/r/actions/runs", server.uri());
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "total_count": 5000,
                        "workflow_runs": numbered(0..100)
                    }))
                    .insert_header("link", format!(r#"<{}?page=next>; rel="next""#, base).as_str()),
            )
            .expect(MAX_PAGES as u64)
            .mount(&server)
            .await;

        let paged = anonymous_client(&server).get_all_pages(&base).await;
        assert_eq!(paged.pages, MAX_PAGES);
        assert_eq!(paged.items.len(), MAX_PAGES * PER_PAGE);
    }

    #[tokio::test]
    async fn test_later_page_error_keeps_earlier_items() {
        let server = MockServer::start().await;
        let base = format!("{}/repos/o/r/pulls", server.uri());
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(numbered(0..100))
                    .insert_header("link", format!(r#"<{}?page=2>; rel="next""#, base).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let paged = anonymous_client(&server).get_all_pages(&base).await;

        assert!(paged.is_partial());
        assert_eq!(paged.items.len(), 100);
        assert!(matches!(paged.error, Some(DashError::Http { status: 500, .. })));
    }
}
