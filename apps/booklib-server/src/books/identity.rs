//! The only place a book crosses the storage boundary.
//!
//! Documents never carry an `id`: [`seal`] strips it on every write and
//! [`unseal`] stamps the row key on every read.

use anyhow::anyhow;
use booklib_core::Book;
use booklib_kernel::DocumentRow;
use serde_json::Value;

use crate::BookError;

pub(crate) fn seal(book: &Book) -> Result<Value, BookError> {
    let mut doc = book
        .to_value()
        .map_err(|e| BookError::Storage(anyhow!("failed to encode book: {e}")))?;
    if let Value::Object(map) = &mut doc {
        map.remove("id");
    }
    Ok(doc)
}

pub(crate) fn unseal(row: DocumentRow) -> Result<Book, BookError> {
    let DocumentRow { id, document } = row;
    let mut book = Book::from_value(document)
        .map_err(|e| BookError::Storage(anyhow!("row {id} is not a valid book: {e}")))?;
    book.id = Some(id);
    Ok(book)
}
