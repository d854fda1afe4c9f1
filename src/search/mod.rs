//! Free-text search over mirror items.
//!
//! - [`parser`]: splits a search string into [`Predicate`]s
//! - [`pattern`]: compiles predicate values into matchers
//! - [`evaluator`]: narrows an item list predicate by predicate
//! - [`sort`]: orders the results

pub mod compare;
pub mod duration;
pub mod evaluator;
pub mod parser;
pub mod pattern;
pub mod sort;

pub use evaluator::SearchScope;
pub use parser::{parse, Predicate};
pub use sort::Sort;
