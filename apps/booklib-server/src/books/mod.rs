mod identity;

use booklib_core::{patch_book, Book, FilterPath};
use booklib_kernel::{JsonFilter, Kernel};
use serde_json::Value;
use tracing::{debug, info};

use crate::BookError;

use identity::{seal, unseal};

#[derive(Clone)]
pub(crate) struct BookService {
    kernel: Kernel,
}

impl BookService {
    /// Maximum number of distinct query parameters accepted by [`Self::list`].
    pub const MAX_FILTERS: usize = 2;

    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub async fn get(&self, id: i64) -> Result<Book, BookError> {
        let row = self
            .kernel
            .find_by_id_async(id)
            .await?
            .ok_or_else(BookError::not_found)?;
        unseal(row)
    }

    /// Books matching every `(path, value)` pair, in caller order. Repeated
    /// keys keep their first value.
    pub async fn list(&self, params: Vec<(String, String)>) -> Result<Vec<Book>, BookError> {
        let mut filters: Vec<JsonFilter> = Vec::with_capacity(params.len());
        let mut seen: Vec<String> = Vec::new();
        for (key, value) in params {
            if seen.contains(&key) {
                continue;
            }
            if seen.len() == Self::MAX_FILTERS {
                return Err(BookError::bad_request(format!(
                    "The max amount of query params that can be used is currently {}",
                    Self::MAX_FILTERS
                )));
            }
            let path = FilterPath::parse(&key)
                .map_err(|e| BookError::bad_request(format!("invalid query param: {e}")))?;
            seen.push(key);
            filters.push(JsonFilter::new(path, value));
        }
        let rows = if filters.is_empty() {
            self.kernel.find_all_async().await?
        } else {
            debug!(filters = filters.len(), "filtering books");
            self.kernel.find_by_filters_async(filters).await?
        };
        rows.into_iter().map(unseal).collect()
    }

    pub async fn create(&self, body: Value) -> Result<Book, BookError> {
        if body.get("id").is_some_and(|id| !id.is_null()) {
            return Err(BookError::bad_request("Book Ids are auto generated"));
        }
        let book = Book::from_value(body)
            .map_err(|e| BookError::bad_request(format!("Invalid book: {e}")))?;
        let row = self.kernel.save_async(None, seal(&book)?).await?;
        info!(id = row.id, "book created");
        unseal(row)
    }

    pub async fn patch(&self, id: i64, patch: Value) -> Result<Book, BookError> {
        if patch.get("id").is_some() {
            return Err(BookError::bad_request("Cannot update Id"));
        }
        let current = self.get(id).await?;
        let patched = patch_book(&current, &patch).map_err(|e| {
            info!(id, error = %e, "invalid patch request body");
            BookError::bad_request("Invalid patch request body")
        })?;
        let row = self.kernel.save_async(Some(id), seal(&patched)?).await?;
        info!(id, "book patched");
        unseal(row)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookError> {
        if !self.kernel.exists_by_id_async(id).await? {
            return Err(BookError::not_found());
        }
        self.kernel.delete_by_id_async(id).await?;
        info!(id, "book deleted");
        Ok(())
    }
}
