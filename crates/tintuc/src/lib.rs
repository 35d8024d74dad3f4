// ABOUTME: Main library entry point for the tintuc article extractor.
// ABOUTME: Re-exports the public API: Extractor, ArticleRecord, ExtractError and friends.

//! tintuc - structured article extraction for Vietnamese news sites.
//!
//! Every supported site is described by a [`SiteProfile`] (the domain that
//! identifies it and the CSS selector of its article body). An [`Extractor`]
//! resolves a URL to its profile, fetches the page, and builds an
//! [`ArticleRecord`] from the page's meta tags, its JSON-LD blocks and the
//! body paragraphs selected under an [`ExtractionPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use tintuc::{ExtractError, Extractor};
//!
//! fn main() -> Result<(), ExtractError> {
//!     let mut extractor = Extractor::builder().paragraphs(3).build()?;
//!     let record = extractor.extract_one("https://vnexpress.net/bai-viet-4913042.html")?;
//!     println!("{}", record.body.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extractor;
pub mod metadata;
pub mod normalize;
pub mod options;
pub mod output;
pub mod paragraphs;
pub mod record;
pub mod session;
pub mod sites;

pub use crate::error::{ErrorCode, ExtractError};
pub use crate::extractor::Extractor;
pub use crate::options::{ExtractionPolicy, ExtractorBuilder, Options};
pub use crate::output::{write_record, BatchReport, BatchWriter};
pub use crate::record::ArticleRecord;
pub use crate::session::{Session, SessionConfig};
pub use crate::sites::{load_builtin_registry, SiteProfile, SiteRegistry};
