//! # bmecat
//!
//! Streaming reader and writer for BMEcat 1.2 product catalogs.
//!
//! [`Reader`] makes two passes over a seekable source: the first counts the
//! payload elements and indexes article to catalog group mappings, the second
//! decodes the header, groups and articles and hands each to a callback.
//! [`Writer`] emits a catalog from a [`CatalogDescription`] and a stream of
//! articles.

pub mod article;
pub mod catalog_group;
pub mod charset;
pub mod classification;
pub mod cli;
pub mod config;
pub mod context;
pub mod date_time;
pub mod error;
pub mod header;
pub mod mime;
pub mod output;
pub mod reader;
pub mod udx;
pub mod writer;

pub use article::{Article, ArticleMode};
pub use catalog_group::{ArticleToCatalogGroupMap, CatalogGroup, GroupSystem, GroupType};
pub use classification::{ClassificationGroup, ClassificationSystem};
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use context::CancelContext;
pub use date_time::DateTime;
pub use error::{BmecatError, BoxError, ConfigError, HandlerError, HandlerResult, Result};
pub use header::Header;
pub use mime::{Mime, MimeInfo};
pub use output::{InfoReport, Output, PerfReport};
pub use reader::{Handlers, ReadProgress, ReadProgressCallback, Reader, ReaderOptions};
pub use udx::{ExtensionField, Extensions};
pub use writer::{
    ArticleFeed, CatalogDescription, Transaction, WriteProgressCallback, Writer, WriterOptions,
};
