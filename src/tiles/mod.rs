pub mod fetch;
pub mod source;

// Re-exports for convenience
pub use fetch::{BitmapFetcher, HttpFetcher};
pub use source::{TileSource, UrlTemplate};
