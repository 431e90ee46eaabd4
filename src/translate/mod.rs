//! Translation of dialect-neutral filters, sorts and deltas into native syntax.
//!
//! All translators are pure: they borrow their input, allocate a fresh native
//! value and keep no state between calls.

mod delta;
mod filter;
mod parse;
mod sort;

pub use delta::translate_delta;
pub use filter::{OPERATOR_SIGIL, translate_filter};
pub use parse::{parse_delta_json, parse_filter_json, parse_sort_json};
pub use sort::{NativeSort, parse_sort, translate_sort};

pub(crate) use filter::is_operator;
