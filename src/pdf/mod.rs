pub mod content;
pub mod document;
pub mod fonts;
pub mod image;
pub mod optimizer;

pub use document::{PageInfo, PdfDocument};
