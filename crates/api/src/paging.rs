//! Auto-pagination over list endpoints.
//!
//! A list endpoint answers `{<list_key>: [...], page, count, total, sort}`.
//! With `size < -1` the absolute value is the page size and every page is
//! fetched in ascending order; `size == -1` asks the platform for everything
//! in one request, and `size >= 0` sends exactly the page the caller asked for.

use std::pin::pin;

use beehive_types::PageQuery;
use beehive_util::multi_get;
use futures_util::{Stream, StreamExt, stream};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::{ApiClient, ApiError, CallOptions};

/// Default ceiling on the number of records auto-pagination will fetch.
pub const DEFAULT_PAGE_CAP: u64 = 10_000;

/// One paginated list query.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub uri: String,
    /// Filters sent with every page.
    pub query: Vec<(String, String)>,
    pub page: PageQuery,
    /// Dotted path of the total record count in a page.
    pub total_key: String,
    /// Key of the record array in a page.
    pub list_key: String,
}

impl PageRequest {
    pub fn new(uri: impl Into<String>, list_key: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            query: Vec::new(),
            page: PageQuery::default(),
            total_key: "total".to_string(),
            list_key: list_key.into(),
        }
    }

    pub fn page(mut self, page: PageQuery) -> Self {
        self.page = page;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn total_key(mut self, total_key: impl Into<String>) -> Self {
        self.total_key = total_key.into();
        self
    }

    fn is_auto(&self) -> bool {
        self.page.size < -1
    }
}

/// What [`ApiClient::get_pages`] does with each page.
pub enum PageCollect<'a> {
    /// Concatenate every page into one response.
    All,
    /// Hand each page to the callback as it arrives.
    Each(&'a mut (dyn FnMut(Value) -> Result<(), ApiError> + Send)),
}

enum Cursor {
    First,
    Next { page: i64, pages: i64, size: i64 },
    Done,
}

impl ApiClient {
    /// Lazily fetch the pages of `request` in ascending order.
    ///
    /// The stream ends after the first error.
    pub fn pages<'a>(&'a self, request: &'a PageRequest) -> impl Stream<Item = Result<Value, ApiError>> + Send + 'a {
        stream::unfold(Cursor::First, move |cursor| async move {
            match cursor {
                Cursor::Done => None,
                Cursor::First if !request.is_auto() => {
                    let page = self.fetch_page(request, request.page.size, request.page.page).await;
                    Some((page, Cursor::Done))
                }
                Cursor::First => {
                    let size = -request.page.size;
                    let first = match self.fetch_page(request, size, 0).await {
                        Ok(first) => first,
                        Err(err) => return Some((Err(err), Cursor::Done)),
                    };
                    let total = total_of(&first, &request.total_key);
                    if total > self.page_cap() {
                        return Some((
                            Err(ApiError::TooManyRecords {
                                total,
                                cap: self.page_cap(),
                            }),
                            Cursor::Done,
                        ));
                    }
                    let pages = (total.div_ceil(size as u64) as i64).max(1);
                    debug!(uri = %request.uri, total, size, pages, "paginating");
                    let next = if pages > 1 { Cursor::Next { page: 1, pages, size } } else { Cursor::Done };
                    Some((Ok(first), next))
                }
                Cursor::Next { page, pages, size } => match self.fetch_page(request, size, page).await {
                    Ok(value) => {
                        let next = if page + 1 < pages {
                            Cursor::Next { page: page + 1, pages, size }
                        } else {
                            Cursor::Done
                        };
                        Some((Ok(value), next))
                    }
                    Err(err) => Some((Err(err), Cursor::Done)),
                },
            }
        })
    }

    /// Fetch every page of `request` and collect or stream the records.
    ///
    /// `PageCollect::All` returns the first page with its list replaced by
    /// the records of all pages, `count` set to their number and `page` set
    /// to 0. `PageCollect::Each` returns `Value::Null` once every page has
    /// been handed over.
    pub async fn get_pages(&self, request: &PageRequest, collect: PageCollect<'_>) -> Result<Value, ApiError> {
        let mut pages = pin!(self.pages(request));
        match collect {
            PageCollect::Each(callback) => {
                while let Some(page) = pages.next().await {
                    callback(page?)?;
                }
                Ok(Value::Null)
            }
            PageCollect::All => {
                let mut first: Option<Value> = None;
                let mut records = Vec::new();
                while let Some(page) = pages.next().await {
                    let page = page?;
                    if let Some(Value::Array(items)) = page.get(&request.list_key) {
                        records.extend(items.iter().cloned());
                    }
                    first.get_or_insert(page);
                }
                let mut combined = first.unwrap_or(Value::Null);
                if request.is_auto()
                    && let Value::Object(map) = &mut combined
                {
                    map.insert("count".into(), Value::from(records.len()));
                    map.insert("page".into(), Value::from(0));
                    map.insert(request.list_key.clone(), Value::Array(records));
                }
                Ok(combined)
            }
        }
    }

    async fn fetch_page(&self, request: &PageRequest, size: i64, page: i64) -> Result<Value, ApiError> {
        let query = PageQuery {
            size,
            page,
            ..request.page.clone()
        };
        let options = CallOptions::new().query(request.query.iter().cloned()).query(query.query_pairs());
        self.call(&request.uri, Method::GET, None, &options).await
    }
}

fn total_of(page: &Value, total_key: &str) -> u64 {
    match multi_get(page, total_key) {
        Some(Value::Number(number)) => number.as_u64().unwrap_or_default(),
        Some(Value::String(text)) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use beehive_types::{EndpointRecord, Environment};
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        let mut environment = Environment::default();
        let record = EndpointRecord::from_url("resource", &server.base_url()).expect("endpoint");
        environment.endpoints.insert("resource".into(), vec![record]);
        ApiClient::new(Arc::new(environment), "resource").expect("client")
    }

    async fn serve_five_items(server: &MockServer) {
        let pages = [
            ("0", json!([{"id": 1}, {"id": 2}])),
            ("1", json!([{"id": 3}, {"id": 4}])),
            ("2", json!([{"id": 5}])),
        ];
        for (page, items) in pages {
            let count = items.as_array().map_or(0, Vec::len);
            let body = json!({
                "entities": items,
                "page": page.parse::<i64>().unwrap(),
                "count": count,
                "total": 5,
                "sort": {"field": "id", "order": "DESC"}
            });
            server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path("/entities")
                        .query_param("size", "2")
                        .query_param("page", page)
                        .query_param("state", "active");
                    then.status(200).json_body(body);
                })
                .await;
        }
    }

    #[tokio::test]
    async fn collects_every_page_when_size_is_below_minus_one() {
        let server = MockServer::start_async().await;
        serve_five_items(&server).await;
        let request = PageRequest::new("/entities", "entities")
            .filter("state", "active")
            .page(PageQuery {
                size: -2,
                ..PageQuery::default()
            });
        let combined = client(&server).get_pages(&request, PageCollect::All).await.expect("pages");
        let ids: Vec<i64> = combined["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(combined["count"], 5);
        assert_eq!(combined["page"], 0);
        assert_eq!(combined["total"], 5);
    }

    #[tokio::test]
    async fn streams_pages_in_order_to_a_callback() {
        let server = MockServer::start_async().await;
        serve_five_items(&server).await;
        let request = PageRequest::new("/entities", "entities")
            .filter("state", "active")
            .page(PageQuery {
                size: -2,
                ..PageQuery::default()
            });
        let mut seen = Vec::new();
        let mut record = |page: Value| -> Result<(), ApiError> {
            seen.push(page["page"].as_i64().unwrap_or(-1));
            Ok(())
        };
        let result = client(&server)
            .get_pages(&request, PageCollect::Each(&mut record))
            .await
            .expect("pages");
        assert!(result.is_null());
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn refuses_to_fetch_past_the_cap() {
        let server = MockServer::start_async().await;
        serve_five_items(&server).await;
        let request = PageRequest::new("/entities", "entities")
            .filter("state", "active")
            .page(PageQuery {
                size: -2,
                ..PageQuery::default()
            });
        let err = client(&server)
            .with_page_cap(4)
            .get_pages(&request, PageCollect::All)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TooManyRecords { total: 5, cap: 4 }));
    }

    #[tokio::test]
    async fn explicit_sizes_send_a_single_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/entities").query_param("size", "3").query_param("page", "1");
                then.status(200).json_body(json!({"entities": [{"id": 4}], "page": 1, "count": 1, "total": 4}));
            })
            .await;
        let request = PageRequest::new("/entities", "entities").page(PageQuery {
            size: 3,
            page: 1,
            ..PageQuery::default()
        });
        let response = client(&server).get_pages(&request, PageCollect::All).await.expect("page");
        assert_eq!(response["page"], 1);
        assert_eq!(response["count"], 1);
        mock.assert_async().await;
    }

    #[test]
    fn totals_accept_numbers_and_strings() {
        assert_eq!(total_of(&json!({"total": 7}), "total"), 7);
        assert_eq!(total_of(&json!({"meta": {"total": "12"}}), "meta.total"), 12);
        assert_eq!(total_of(&json!({}), "total"), 0);
    }
}
