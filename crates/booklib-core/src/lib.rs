//! Record model and the pure document helpers shared by the store and the server.

mod book;
pub mod filter;
pub mod merge_patch;

pub use book::Book;
pub use filter::{FilterPath, FilterPathError};
pub use merge_patch::{patch_book, PatchError};
