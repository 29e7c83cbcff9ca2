//! spendscore-ingest: CSV reading and normalization of mapped rows into transactions.

pub mod normalize;
pub mod reader;
pub mod summary;
pub mod types;

pub use normalize::{clean_amount, normalize, parse_date};
pub use reader::{decode, read_sample};
pub use summary::summarize;
pub use types::{NormalizedBatch, NormalizedTransaction, TransactionSummary};
