//! Bulk endpoint pagination.
//!
//! Paginated endpoints answer with
//! `{"offset": 0, "limit": 250, "size": 250, "_links": {"next": "/api/v2/...", "prev": null}, "<key>": [...]}`.
//! Older servers answer with a bare array; that is treated as a single page.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::http::HttpBackend;
use crate::error::{ApiError, ApiResult};

/// Lazy sequence of entities across all pages. Each call to a listing method
/// starts again from the first page.
pub type Listing<'a, T> = BoxStream<'a, ApiResult<T>>;

/// One decoded page.
#[derive(Debug)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T: DeserializeOwned> Page<T> {
    pub(crate) fn parse(value: Value, key: &str) -> ApiResult<Self> {
        let (items, next) = match value {
            Value::Array(items) => (Value::Array(items), None),
            Value::Object(mut obj) => {
                let next = obj
                    .get("_links")
                    .and_then(|links| links.get("next"))
                    .and_then(Value::as_str)
                    .map(link_to_uri);
                let items = obj.remove(key).ok_or_else(|| ApiError::InvalidResponse {
                    message: format!("listing has no '{}' field", key),
                })?;
                (items, next)
            }
            Value::Null => (Value::Array(Vec::new()), None),
            other => {
                return Err(ApiError::InvalidResponse {
                    message: format!("unexpected listing shape: {}", other),
                })
            }
        };

        let items = serde_json::from_value(items).map_err(|e| ApiError::InvalidResponse {
            message: format!("failed to decode '{}' page: {}", key, e),
        })?;
        Ok(Self { items, next })
    }
}

/// Turn a `_links.next` value into a URI relative to the API root.
pub(crate) fn link_to_uri(link: &str) -> String {
    let link = link.trim_start_matches('/');
    let link = link.strip_prefix("index.php?/").unwrap_or(link);
    let link = link.trim_start_matches('/');
    link.strip_prefix("api/v2/").unwrap_or(link).to_string()
}

/// Follow `next` links starting at `uri`, yielding entities one by one.
pub(crate) fn paginate<'a, T>(backend: &'a HttpBackend, uri: String, key: &'static str) -> Listing<'a, T>
where
    T: DeserializeOwned + Send + 'a,
{
    let init: (Option<String>, VecDeque<T>) = (Some(uri), VecDeque::new());
    stream::try_unfold(init, move |(mut next, mut buffer)| async move {
        loop {
            if let Some(item) = buffer.pop_front() {
                return Ok::<_, ApiError>(Some((item, (next, buffer))));
            }
            let Some(uri) = next.take() else {
                return Ok::<_, ApiError>(None);
            };
            let page = Page::<T>::parse(backend.get(&uri).await?, key)?;
            next = page.next;
            buffer.extend(page.items);
        }
    })
    .boxed()
}
