//! Per-page mutation handlers. Each takes the live document plus one rule's
//! fields and mutates it in place.

pub mod decorate;
pub mod metadata;
pub mod overlay;
pub mod pages;
pub mod resize;
pub mod stamp;
