//! Candidate record extraction from filtered text blocks and reconstructed
//! tables.

mod table;
mod text;

pub use table::records_from_tables;
pub use text::extract_from_text_block;
