//! Agent adapters.

mod keyword;

pub use keyword::KeywordAgent;
