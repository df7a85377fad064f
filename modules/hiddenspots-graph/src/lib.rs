pub mod client;
pub mod migrate;
pub mod query;
pub mod reader;
pub mod writer;

pub use client::GraphClient;
pub use query::{Page, Pagination, SortDirection, SpotFilter, SpotQuery, SpotSort};
pub use reader::SpotReader;
pub use writer::SpotWriter;
