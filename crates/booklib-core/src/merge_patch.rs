//! JSON merge patch (RFC 7396) over plain `serde_json::Value` trees.
//!
//! [`apply`] knows nothing about books; [`patch_book`] layers record
//! validation on top so a patch either yields a complete, valid [`Book`] or
//! fails without side effects.

use serde_json::Value;
use thiserror::Error;

use crate::Book;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("merge patch must be a JSON object")]
    NotAnObject,
    #[error("patched document is not a valid book: {0}")]
    Invalid(#[source] serde_json::Error),
    #[error("failed to encode book: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Apply `patch` to a copy of `target` and return the result.
///
/// Null members delete keys, object members merge recursively (creating the
/// target object when missing) and everything else replaces the existing
/// value. A non-object patch replaces the whole document.
pub fn apply(target: &Value, patch: &Value) -> Value {
    let mut doc = target.clone();
    json_patch::merge(&mut doc, patch);
    doc
}

/// Merge-patch a book's document form and decode the result.
pub fn patch_book(book: &Book, patch: &Value) -> Result<Book, PatchError> {
    if !patch.is_object() {
        return Err(PatchError::NotAnObject);
    }
    let current = book.to_value().map_err(PatchError::Encode)?;
    let patched = apply(&current, patch);
    Book::from_value(patched).map_err(PatchError::Invalid)
}
