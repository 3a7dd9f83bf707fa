//! Platform handlers
//!
//! A handler knows how to read metadata from one platform and how to
//! transfer its media to disk. Handlers are resolved per execution from
//! the [`HandlerRegistry`]; platforms without a dedicated handler fall
//! back to [`GenericHandler`].
//!
//! ## Key Components
//!
//! - [`PlatformHandler`] - Capability set every handler implements
//! - [`HandlerRegistry`] - Platform to handler lookup
//! - [`process_formats`] - Shared normalization of engine format lists
//! - [`VideoInfo`] / [`DownloadResult`] - Handler outputs
//!
//! ## Example
//!
//! ```rust,ignore
//! use vidfetch::handlers::HandlerRegistry;
//! use vidfetch::urls::Platform;
//!
//! let registry = HandlerRegistry::with_defaults(engine, &config.engine)?;
//! let handler = registry.resolve(Platform::Vimeo)?;
//! let info = handler.extract_info("https://vimeo.com/123456").await?;
//! ```

mod common;
mod facebook;
mod formats;
mod generic;
mod registry;
mod tiktok;
mod traits;
pub(crate) mod types;
mod youtube;

pub use facebook::FacebookHandler;
pub use formats::{FormatDescriptor, RawFormat, describe, process_formats};
pub use generic::GenericHandler;
pub use registry::{HandlerRegistry, RegistryError};
pub use tiktok::TikTokHandler;
pub use traits::{HandlerError, PlatformHandler};
pub use types::{DownloadResult, VideoInfo};
pub use youtube::YouTubeHandler;
