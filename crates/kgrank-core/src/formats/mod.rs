//! Triple-source readers.
//!
//! - [`csv`] - headerless `head,relation,tail` files (labels or raw ids)
//! - [`json`] - `{ "name": id }` id tables

pub mod csv;
pub mod json;
