pub mod assemble;
pub mod assets;
pub mod document;
pub mod error;
pub mod fetch;
pub mod lazyload;
pub mod normalize;
pub mod payload;
pub mod render;
pub mod timestamp;

#[cfg(test)]
mod test_helpers;

pub use assemble::{Assembler, DEFAULT_API_BASE, OffprintConfig, OffprintConfigBuilder};
#[cfg(feature = "fetch")]
pub use assemble::fetch_and_render;
pub use assets::{AssetCache, AssetPolicy, DEFAULT_ASSET_PREFIX, asset_file_name};
pub use document::{Comment, Document, DocumentBuilder};
pub use error::{AssemblyStep, OffprintError, Result};
#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchConfig, Fetcher};
pub use lazyload::resolve_lazy_images;
pub use normalize::{demote_headings, localize_images, normalize_body, remote_image_sources, rewrite_image_sources};
#[cfg(feature = "markdown")]
pub use render::MarkdownRenderer;
pub use render::{HtmlRenderer, JsonRenderer, Renderer};
