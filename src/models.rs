pub mod docset;
pub mod document;
pub mod error;
pub mod filter;
pub mod index;
pub mod join;
pub mod parsing;
pub mod queries;
pub mod schema;
pub mod search;
pub mod snapshot;
pub mod term_cursor;
pub mod types;
