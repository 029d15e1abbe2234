pub mod archive;
pub mod config;
pub mod error;
pub mod external;
pub mod geometry;
pub mod ops;
pub mod pdf;
pub mod pipeline;
pub mod redact;
pub mod rules;
pub mod service;
pub mod split;
pub mod store;
pub mod word;
