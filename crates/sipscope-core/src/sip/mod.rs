//! SIP trace decoding.
//!
//! Mirrors the layered structure used for wire protocols, applied to text:
//! - `layout`: markers, header labels and patterns (source of truth)
//! - `reader`: tolerant access to one block's text
//! - `segment`: grouping raw lines into message blocks
//! - `parser`: field extraction and session signals
//!
//! Nothing here fails. A block that matches no pattern yields a record of
//! empty fields, which callers may filter.

pub mod layout;
pub mod parser;
pub mod reader;
pub mod segment;

pub use parser::{
    Direction, FIELD_KEYS, FieldRecord, Observation, SessionSignals, extract, observe, signals,
};
pub use segment::{MessageBlock, RawLine, Segmenter, is_block_start, segment};
