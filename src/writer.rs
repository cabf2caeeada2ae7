//! Sequential streaming catalog writer.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

use crate::article::Article;
use crate::catalog_group::GroupSystem;
use crate::classification::ClassificationSystem;
use crate::config::WriterConfig;
use crate::context::CancelContext;
use crate::error::{BmecatError, BoxError, Result};
use crate::header::Header;
use crate::udx::Extensions;

const DOCTYPE: &str = r#"BMECAT SYSTEM "bmecat_new_catalog.dtd""#;
const ROOT: &str = "BMECAT";
const VERSION: &str = "1.2";

/// Document profile of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transaction {
    #[default]
    NewCatalog,
    UpdateProducts,
    UpdatePrices,
}

impl Transaction {
    /// Name of the transaction element.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transaction::NewCatalog => "T_NEW_CATALOG",
            Transaction::UpdateProducts => "T_UPDATE_PRODUCTS",
            Transaction::UpdatePrices => "T_UPDATE_PRICES",
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            Transaction::NewCatalog => "http://www.bmecat.org/bmecat/1.2/bmecat_new_catalog",
            Transaction::UpdateProducts => {
                "http://www.bmecat.org/bmecat/1.2/bmecat_update_products"
            }
            Transaction::UpdatePrices => "http://www.bmecat.org/bmecat/1.2/bmecat_update_prices",
        }
    }

    /// Update transactions carry a `prev_version` attribute.
    pub fn is_update(&self) -> bool {
        !matches!(self, Transaction::NewCatalog)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Articles to write plus a channel on which the producer reports failures.
///
/// `articles: None` writes no articles. `errors: None` means the producer never fails.
#[derive(Default)]
pub struct ArticleFeed {
    pub articles: Option<BoxStream<'static, Article>>,
    pub errors: Option<mpsc::Receiver<BoxError>>,
}

impl ArticleFeed {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        articles: impl Stream<Item = Article> + Send + 'static,
        errors: Option<mpsc::Receiver<BoxError>>,
    ) -> Self {
        Self {
            articles: Some(articles.boxed()),
            errors,
        }
    }

    /// Feed backed by a producer task sending on `articles` and `errors`.
    pub fn from_receiver(
        articles: mpsc::Receiver<Article>,
        errors: mpsc::Receiver<BoxError>,
    ) -> Self {
        Self::new(ReceiverStream::new(articles), Some(errors))
    }

    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self::new(stream::iter(articles), None)
    }
}

/// What the writer asks of the caller.
pub trait CatalogDescription {
    fn transaction(&self) -> Transaction;

    fn language(&self) -> String;

    /// Only meaningful for update transactions.
    fn previous_version(&self) -> i32;

    fn header(&self) -> Option<&Header>;

    fn classification_system(&self) -> Option<&ClassificationSystem>;

    /// Implement to write a `CATALOG_GROUP_SYSTEM` in new catalogs.
    fn group_system(&self) -> Option<&GroupSystem> {
        None
    }

    /// Called once, after everything before the articles has been written.
    fn articles(&mut self, cancel: &CancelContext) -> ArticleFeed;
}

/// Progress callback receiving the number of articles written so far
pub type WriteProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone)]
pub struct WriterOptions {
    /// Indent characters per level. 0 disables pretty printing.
    pub indent: usize,
    pub indent_char: u8,
    pub progress: Option<WriteProgressCallback>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            indent_char: b' ',
            progress: None,
        }
    }
}

impl WriterOptions {
    pub fn from_config(config: &WriterConfig) -> Self {
        Self {
            indent: config.indent,
            // Only ASCII keeps the output valid UTF-8 with a one-byte indent.
            indent_char: if config.indent_char.is_ascii() {
                config.indent_char as u8
            } else {
                b' '
            },
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: WriteProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Writes one catalog document to `W`.
pub struct Writer<W: Write> {
    xml: quick_xml::Writer<W>,
    progress: Option<WriteProgressCallback>,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, WriterOptions::default())
    }

    pub fn with_options(inner: W, options: WriterOptions) -> Self {
        let xml = if options.indent == 0 {
            quick_xml::Writer::new(inner)
        } else {
            quick_xml::Writer::new_with_indent(inner, options.indent_char, options.indent)
        };
        Self {
            xml,
            progress: options.progress,
        }
    }

    pub fn into_inner(self) -> W {
        self.xml.into_inner()
    }

    /// Write the complete document described by `catalog`.
    ///
    /// On cancellation or a producer error the output is left unterminated.
    pub async fn run<C>(&mut self, cancel: &CancelContext, catalog: &mut C) -> Result<()>
    where
        C: CatalogDescription + ?Sized,
    {
        cancel.check()?;
        let tx = catalog.transaction();

        self.write_lead_in(tx, &catalog.language())?;

        if let Some(header) = catalog.header() {
            self.write_header(header)?;
        }

        let mut start = BytesStart::new(tx.as_str());
        if tx.is_update() {
            let prev_version = catalog.previous_version().to_string();
            start.push_attribute(("prev_version", prev_version.as_str()));
        }
        self.event(tx.as_str(), Event::Start(start))?;

        if tx == Transaction::NewCatalog {
            if let Some(system) = catalog.classification_system()
                && !system.is_blank()
            {
                self.serializable("CLASSIFICATION_SYSTEM", system)?;
            }
            if let Some(system) = catalog.group_system()
                && !system.is_blank()
            {
                self.serializable("CATALOG_GROUP_SYSTEM", system)?;
            }
        }

        let feed = catalog.articles(cancel);
        let written = self.write_articles(cancel, feed).await?;
        debug!(transaction = %tx, written, "wrote articles");

        // ARTICLE_TO_CATALOGGROUP_MAP is not written for any transaction.

        self.event(tx.as_str(), Event::End(BytesEnd::new(tx.as_str())))?;
        self.event(ROOT, Event::End(BytesEnd::new(ROOT)))?;
        self.xml
            .get_mut()
            .flush()
            .map_err(|e| BmecatError::encode("lead out", e))?;
        Ok(())
    }

    fn write_lead_in(&mut self, tx: Transaction, language: &str) -> Result<()> {
        const PART: &str = "lead in";
        self.event(
            PART,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        self.event(PART, Event::DocType(BytesText::from_escaped(DOCTYPE)))?;

        // xml:lang is not written.
        trace!(language, "opening catalog");
        let root = BytesStart::new(ROOT)
            .with_attributes([("xmlns", tx.namespace()), ("version", VERSION)]);
        self.event(PART, Event::Start(root))
    }

    fn write_header(&mut self, header: &Header) -> Result<()> {
        const PART: &str = "HEADER";
        self.event(PART, Event::Start(BytesStart::new(PART)))?;
        if !header.generator_info.is_empty() {
            self.text_element(PART, "GENERATOR_INFO", &header.generator_info)?;
        }
        self.serializable("CATALOG", &header.catalog)?;
        if let Some(buyer) = &header.buyer {
            self.serializable("BUYER", buyer)?;
        }
        for agreement in &header.agreements {
            self.serializable("AGREEMENT", agreement)?;
        }
        if let Some(supplier) = &header.supplier {
            self.serializable("SUPPLIER", supplier)?;
        }
        if let Some(udx) = &header.udx {
            self.extensions(PART, udx)?;
        }
        self.event(PART, Event::End(BytesEnd::new(PART)))
    }

    async fn write_articles(&mut self, cancel: &CancelContext, feed: ArticleFeed) -> Result<usize> {
        let ArticleFeed {
            articles,
            mut errors,
        } = feed;
        let Some(mut articles) = articles else {
            return Ok(0);
        };

        let mut written = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BmecatError::Cancelled),
                err = next_error(&mut errors) => return Err(BmecatError::Producer(err)),
                next = articles.next() => match next {
                    Some(article) => {
                        self.write_article(&article)?;
                        written += 1;
                        if let Some(progress) = &self.progress {
                            progress(written);
                        }
                    }
                    None => break,
                },
            }
        }
        Ok(written)
    }

    fn write_article(&mut self, article: &Article) -> Result<()> {
        let part = format!("ARTICLE {:?}", article.supplier_aid);
        trace!(supplier_aid = %article.supplier_aid, "writing article");

        let mut start = BytesStart::new("ARTICLE");
        if let Some(mode) = article.mode {
            start.push_attribute(("mode", mode.as_str()));
        }
        self.event(&part, Event::Start(start))?;
        self.text_element(&part, "SUPPLIER_AID", &article.supplier_aid)?;
        if let Some(details) = &article.details {
            self.serializable("ARTICLE_DETAILS", details)?;
        }
        for features in &article.features {
            self.serializable("ARTICLE_FEATURES", features)?;
        }
        if let Some(order_details) = &article.order_details {
            self.serializable("ARTICLE_ORDER_DETAILS", order_details)?;
        }
        for price_details in &article.price_details {
            self.serializable("ARTICLE_PRICE_DETAILS", price_details)?;
        }
        if let Some(mime_info) = &article.mime_info {
            self.serializable("MIME_INFO", mime_info)?;
        }
        if let Some(udx) = &article.udx {
            self.extensions(&part, udx)?;
        }
        for reference in &article.references {
            self.serializable("ARTICLE_REFERENCE", reference)?;
        }
        self.event(&part, Event::End(BytesEnd::new("ARTICLE")))
    }

    fn event(&mut self, part: &str, event: Event<'_>) -> Result<()> {
        self.xml
            .write_event(event)
            .map_err(|e| BmecatError::encode(part, e))
    }

    fn text_element(&mut self, part: &str, tag: &str, text: &str) -> Result<()> {
        self.event(part, Event::Start(BytesStart::new(tag)))?;
        self.event(part, Event::Text(BytesText::new(text)))?;
        self.event(part, Event::End(BytesEnd::new(tag)))
    }

    fn serializable<T: Serialize>(&mut self, tag: &str, value: &T) -> Result<()> {
        self.xml
            .write_serializable(tag, value)
            .map_err(|e| BmecatError::encode(tag, e))
    }

    fn extensions(&mut self, part: &str, udx: &Extensions) -> Result<()> {
        udx.write_to(&mut self.xml)
            .map_err(|e| BmecatError::encode(format!("{part} USER_DEFINED_EXTENSIONS"), e))
    }
}

/// Next error from the producer. Pends forever once the channel is closed or absent.
async fn next_error(errors: &mut Option<mpsc::Receiver<BoxError>>) -> BoxError {
    let received = match errors.as_mut() {
        Some(rx) => rx.recv().await,
        None => None,
    };
    match received {
        Some(err) => err,
        None => {
            *errors = None;
            std::future::pending().await
        }
    }
}
