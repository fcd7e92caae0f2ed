// Core modules implementing decoding, extraction, and error modeling.
pub mod error;
pub mod graph;
pub mod pool;
pub mod records;
pub mod tags;
