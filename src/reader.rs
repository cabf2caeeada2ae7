//! Two-pass streaming catalog reader.
//!
//! The first pass counts payload elements and collects every
//! `ARTICLE_TO_CATALOGGROUP_MAP` into a cross-reference index. The second pass
//! decodes headers, groups and articles one subtree at a time and hands them to
//! the registered [`Handlers`], with the counters and group memberships from the
//! first pass already attached. Memory use is bounded by the number of mappings,
//! not by the size of the document.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use quick_xml::Writer as XmlWriter;
use quick_xml::events::{BytesStart, Event};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::article::Article;
use crate::catalog_group::{ArticleToCatalogGroupMap, CatalogGroup};
use crate::charset::{self, CharsetResolver};
use crate::classification::ClassificationGroup;
use crate::config::ReaderConfig;
use crate::context::CancelContext;
use crate::error::{BmecatError, HandlerError, HandlerResult, Result};
use crate::header::Header;
use crate::udx::{EXTENSIONS_TAG, Extensions};

type XmlReader<'a> = quick_xml::Reader<BufReader<Box<dyn Read + 'a>>>;

/// Progress update while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadProgress {
    /// 1 for the structural scan, 2 for the decoding pass.
    pub pass: u8,
    /// Approximate byte offset into the (decoded) document.
    pub offset: u64,
}

/// Progress callback type for read updates
pub type ReadProgressCallback = Arc<dyn Fn(ReadProgress) + Send + Sync>;

/// Options for [`Reader`].
#[derive(Clone)]
pub struct ReaderOptions {
    /// Maps the declared document encoding to a transcoder.
    pub charset_resolver: CharsetResolver,
    pub progress: Option<ReadProgressCallback>,
    /// Minimum time between two progress reports within a pass.
    pub progress_interval: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            charset_resolver: charset::resolve,
            progress: None,
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl std::fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl ReaderOptions {
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            progress_interval: Duration::from_millis(config.progress_interval_ms),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: ReadProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_charset_resolver(mut self, resolver: CharsetResolver) -> Self {
        self.charset_resolver = resolver;
        self
    }
}

type Callback<'a, T> = Box<dyn FnMut(T) -> HandlerResult + 'a>;

/// Callbacks invoked during the second pass. Every slot is optional.
///
/// Returning [`HandlerError::EndOfStream`] from the header callback stops
/// reading without an error. Any other error aborts the read.
#[derive(Default)]
pub struct Handlers<'a> {
    pub on_header: Option<Callback<'a, Header>>,
    pub on_catalog_group: Option<Callback<'a, CatalogGroup>>,
    pub on_classification_group: Option<Callback<'a, ClassificationGroup>>,
    pub on_article: Option<Callback<'a, Article>>,
    pub on_complete: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> Handlers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_header(mut self, f: impl FnMut(Header) -> HandlerResult + 'a) -> Self {
        self.on_header = Some(Box::new(f));
        self
    }

    pub fn on_catalog_group(mut self, f: impl FnMut(CatalogGroup) -> HandlerResult + 'a) -> Self {
        self.on_catalog_group = Some(Box::new(f));
        self
    }

    pub fn on_classification_group(
        mut self,
        f: impl FnMut(ClassificationGroup) -> HandlerResult + 'a,
    ) -> Self {
        self.on_classification_group = Some(Box::new(f));
        self
    }

    pub fn on_article(mut self, f: impl FnMut(Article) -> HandlerResult + 'a) -> Self {
        self.on_article = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + 'a) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

/// Article id to the catalog group ids that reference it, in document order.
#[derive(Debug, Default)]
struct CrossReferenceIndex {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl CrossReferenceIndex {
    fn insert(&self, mapping: ArticleToCatalogGroupMap) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| BmecatError::Concurrency {
            details: format!("cross-reference index poisoned: {e}"),
        })?;
        entries
            .entry(mapping.article_id)
            .or_default()
            .push(mapping.catalog_group_id);
        Ok(())
    }

    fn lookup(&self, article_id: &str) -> Result<Option<Vec<String>>> {
        let entries = self.entries.lock().map_err(|e| BmecatError::Concurrency {
            details: format!("cross-reference index poisoned: {e}"),
        })?;
        Ok(entries.get(article_id).cloned())
    }

    /// Number of distinct articles with at least one mapping.
    fn len(&self) -> Result<usize> {
        let entries = self.entries.lock().map_err(|e| BmecatError::Concurrency {
            details: format!("cross-reference index poisoned: {e}"),
        })?;
        Ok(entries.len())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    articles: usize,
    catalog_groups: usize,
    classification_groups: usize,
}

/// Allows at most one event per interval; the first call always passes.
struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn allow(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Header,
    CatalogGroup,
    ClassificationGroup,
    Article,
    Mapping,
}

impl Payload {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"HEADER" => Some(Payload::Header),
            b"CATALOG_STRUCTURE" => Some(Payload::CatalogGroup),
            b"CLASSIFICATION_GROUP" => Some(Payload::ClassificationGroup),
            b"ARTICLE" => Some(Payload::Article),
            b"ARTICLE_TO_CATALOGGROUP_MAP" => Some(Payload::Mapping),
            _ => None,
        }
    }

    fn element(self) -> &'static str {
        match self {
            Payload::Header => "HEADER",
            Payload::CatalogGroup => "CATALOG_STRUCTURE",
            Payload::ClassificationGroup => "CLASSIFICATION_GROUP",
            Payload::Article => "ARTICLE",
            Payload::Mapping => "ARTICLE_TO_CATALOGGROUP_MAP",
        }
    }
}

/// A payload subtree re-emitted as a standalone document.
struct Captured {
    xml: String,
    udx: Option<Extensions>,
}

/// Reads a catalog from a seekable source.
pub struct Reader<R> {
    source: R,
    options: ReaderOptions,
}

impl<R: Read + Seek> Reader<R> {
    pub fn new(source: R) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Read the whole document twice and dispatch its records to `handlers`.
    ///
    /// Returns [`BmecatError::Cancelled`] as soon as `cancel` fires. On errors
    /// the handlers may already have seen part of the document.
    pub fn run(&mut self, cancel: &CancelContext, mut handlers: Handlers<'_>) -> Result<()> {
        let index = CrossReferenceIndex::default();

        let counts = self.scan(cancel, &index)?;
        debug!(
            articles = counts.articles,
            catalog_groups = counts.catalog_groups,
            classification_groups = counts.classification_groups,
            "finished structural pass"
        );

        self.dispatch(cancel, &index, counts, &mut handlers)?;

        if let Some(on_complete) = handlers.on_complete.take() {
            on_complete();
        }
        Ok(())
    }

    /// Pass 1: count payload elements and build the cross-reference index.
    fn scan(&mut self, cancel: &CancelContext, index: &CrossReferenceIndex) -> Result<Counts> {
        let mut xml = open_pass(&mut self.source, 1, self.options.charset_resolver)?;
        let mut throttle = Throttle::new(self.options.progress_interval);
        let mut counts = Counts::default();
        let mut buf = Vec::new();

        report(&self.options, 1, 0);

        loop {
            let offset = xml.buffer_position() as u64;
            let event = xml
                .read_event_into(&mut buf)
                .map_err(|source| BmecatError::Xml {
                    pass: 1,
                    offset,
                    last_article: None,
                    source,
                })?;

            let (start, empty) = match event {
                Event::Start(e) => (Some(e), false),
                Event::Empty(e) => (Some(e), true),
                Event::Eof => break,
                _ => (None, false),
            };

            if let Some(start) = start {
                match Payload::from_local_name(start.local_name().as_ref()) {
                    Some(Payload::Article) => counts.articles += 1,
                    Some(Payload::CatalogGroup) => counts.catalog_groups += 1,
                    Some(Payload::ClassificationGroup) => counts.classification_groups += 1,
                    Some(Payload::Mapping) => {
                        let captured = capture(&mut xml, &start, empty).map_err(|source| {
                            BmecatError::Xml {
                                pass: 1,
                                offset,
                                last_article: None,
                                source,
                            }
                        })?;
                        let mapping: ArticleToCatalogGroupMap =
                            decode(Payload::Mapping, &captured, offset, &None)?;
                        index.insert(mapping)?;
                    }
                    Some(Payload::Header) | None => {}
                }
            }

            let position = xml.buffer_position() as u64;
            if throttle.allow() {
                report(&self.options, 1, position);
            }
            cancel.check()?;
            buf.clear();
        }

        Ok(counts)
    }

    /// Pass 2: decode payload elements and invoke the handlers.
    fn dispatch(
        &mut self,
        cancel: &CancelContext,
        index: &CrossReferenceIndex,
        counts: Counts,
        handlers: &mut Handlers<'_>,
    ) -> Result<()> {
        let mut xml = open_pass(&mut self.source, 2, self.options.charset_resolver)?;
        let mut throttle = Throttle::new(self.options.progress_interval);
        let mut last_article: Option<String> = None;
        let mut buf = Vec::new();

        report(&self.options, 2, 0);

        loop {
            let offset = xml.buffer_position() as u64;
            let event = xml
                .read_event_into(&mut buf)
                .map_err(|source| BmecatError::Xml {
                    pass: 2,
                    offset,
                    last_article: last_article.clone(),
                    source,
                })?;

            let (start, empty) = match event {
                Event::Start(e) => (Some(e), false),
                Event::Empty(e) => (Some(e), true),
                Event::Eof => break,
                _ => (None, false),
            };

            let payload = start
                .as_ref()
                .and_then(|s| Payload::from_local_name(s.local_name().as_ref()))
                .filter(|p| *p != Payload::Mapping);

            if let (Some(payload), Some(start)) = (payload, start) {
                let captured = capture(&mut xml, &start, empty).map_err(|source| {
                    BmecatError::Xml {
                        pass: 2,
                        offset,
                        last_article: last_article.clone(),
                        source,
                    }
                })?;
                let position = xml.buffer_position() as u64;

                match payload {
                    Payload::Header => {
                        let mut header: Header = decode(payload, &captured, offset, &last_article)?;
                        header.udx = captured.udx;
                        header.number_of_articles = counts.articles;
                        header.number_of_catalog_groups = counts.catalog_groups;
                        header.number_of_classification_groups = counts.classification_groups;
                        header.number_of_article_to_catalog_group_maps = index.len()?;

                        if let Some(on_header) = handlers.on_header.as_mut() {
                            let id = header.catalog.id.clone();
                            trace!(catalog_id = %id, "dispatching header");
                            match on_header(header) {
                                Ok(()) => {}
                                Err(HandlerError::EndOfStream) => {
                                    warn!(catalog_id = %id, "header handler requested end of stream");
                                    return Ok(());
                                }
                                Err(source) => {
                                    return Err(BmecatError::Handler {
                                        element: payload.element(),
                                        id,
                                        offset: position,
                                        source,
                                    });
                                }
                            }
                        }
                    }
                    Payload::CatalogGroup => {
                        let group: CatalogGroup =
                            decode(payload, &captured, offset, &last_article)?;
                        if let Some(on_catalog_group) = handlers.on_catalog_group.as_mut() {
                            let id = group.id.clone();
                            trace!(group_id = %id, "dispatching catalog group");
                            on_catalog_group(group).map_err(|source| BmecatError::Handler {
                                element: payload.element(),
                                id,
                                offset: position,
                                source,
                            })?;
                        }
                    }
                    Payload::ClassificationGroup => {
                        let group: ClassificationGroup =
                            decode(payload, &captured, offset, &last_article)?;
                        if let Some(on_classification_group) =
                            handlers.on_classification_group.as_mut()
                        {
                            let id = group.id.clone();
                            trace!(group_id = %id, "dispatching classification group");
                            on_classification_group(group).map_err(|source| {
                                BmecatError::Handler {
                                    element: payload.element(),
                                    id,
                                    offset: position,
                                    source,
                                }
                            })?;
                        }
                    }
                    Payload::Article => {
                        let mut article: Article =
                            decode(payload, &captured, offset, &last_article)?;
                        article.udx = captured.udx;
                        let id = article.supplier_aid.clone();

                        if let Some(on_article) = handlers.on_article.as_mut() {
                            if let Some(ids) = index.lookup(&id)? {
                                article.catalog_group_ids = ids;
                            }
                            trace!(supplier_aid = %id, "dispatching article");
                            on_article(article).map_err(|source| BmecatError::Handler {
                                element: payload.element(),
                                id: id.clone(),
                                offset: position,
                                source,
                            })?;
                        }
                        last_article = Some(id);
                    }
                    Payload::Mapping => {}
                }
            }

            let position = xml.buffer_position() as u64;
            if throttle.allow() {
                report(&self.options, 2, position);
            }
            cancel.check()?;
            buf.clear();
        }

        debug!(last_article = ?last_article, "finished decoding pass");
        Ok(())
    }
}

impl Reader<Cursor<Vec<u8>>> {
    /// Buffer a non-seekable source completely in memory so it can be read twice.
    pub fn from_unseekable<S: Read>(mut source: S, options: ReaderOptions) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Ok(Self::with_options(Cursor::new(bytes), options))
    }
}

fn report(options: &ReaderOptions, pass: u8, offset: u64) {
    if let Some(progress) = &options.progress {
        progress(ReadProgress { pass, offset });
    }
}

/// Rewind `source` and set up a tokenizer over its UTF-8 decoded content.
fn open_pass<R: Read + Seek>(
    source: &mut R,
    pass: u8,
    resolver: CharsetResolver,
) -> Result<XmlReader<'_>> {
    source.seek(SeekFrom::Start(0)).map_err(BmecatError::Rewind)?;
    let declared = charset::sniff_declared_encoding(&mut *source)
        .map_err(|err| BmecatError::Declaration { pass, source: err })?;
    source.seek(SeekFrom::Start(0)).map_err(BmecatError::Rewind)?;

    let resolved = match declared {
        Some(label) => resolver(&label)?,
        None => None,
    };
    if let Some(resolved) = resolved {
        trace!(pass, charset = resolved.name(), "transcoding document");
    }

    let decoded = charset::decoding_reader(source, resolved);
    Ok(quick_xml::Reader::from_reader(BufReader::new(decoded)))
}

/// Copy the subtree opened by `start` into a buffer, up to its end tag.
///
/// A direct `USER_DEFINED_EXTENSIONS` child goes through the extension codec instead.
fn capture<B: BufRead>(
    xml: &mut quick_xml::Reader<B>,
    start: &BytesStart<'_>,
    empty: bool,
) -> quick_xml::Result<Captured> {
    let mut writer = XmlWriter::new(Vec::new());
    let mut udx = None;

    if empty {
        writer.write_event(Event::Empty(start.borrow()))?;
    } else {
        writer.write_event(Event::Start(start.borrow()))?;

        let mut depth = 0usize;
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if depth == 0 && e.local_name().as_ref() == EXTENSIONS_TAG.as_bytes() {
                        udx = Some(Extensions::read_from(xml)?);
                    } else {
                        depth += 1;
                        writer.write_event(Event::Start(e))?;
                    }
                }
                Event::Empty(e) => {
                    if depth == 0 && e.local_name().as_ref() == EXTENSIONS_TAG.as_bytes() {
                        udx = Some(Extensions::new());
                    } else {
                        writer.write_event(Event::Empty(e))?;
                    }
                }
                Event::End(e) => {
                    writer.write_event(Event::End(e))?;
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Text(e) => writer.write_event(Event::Text(e))?,
                Event::CData(e) => writer.write_event(Event::CData(e))?,
                // A truncated document leaves the capture unbalanced and fails to decode.
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
    }

    Ok(Captured {
        xml: String::from_utf8_lossy(&writer.into_inner()).into_owned(),
        udx,
    })
}

fn decode<T: DeserializeOwned>(
    payload: Payload,
    captured: &Captured,
    offset: u64,
    last_article: &Option<String>,
) -> Result<T> {
    quick_xml::de::from_str(&captured.xml).map_err(|e| BmecatError::Decode {
        element: payload.element(),
        offset,
        last_article: last_article.clone(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BMECAT version="1.2" xmlns="http://www.bmecat.org/bmecat/1.2/bmecat_new_catalog">
  <HEADER>
    <CATALOG>
      <LANGUAGE>deu</LANGUAGE>
      <CATALOG_ID>C1</CATALOG_ID>
      <CATALOG_VERSION>1.0</CATALOG_VERSION>
    </CATALOG>
    <USER_DEFINED_EXTENSIONS>
      <UDX.SYSTEM.CUSTOM_FIELD1>A</UDX.SYSTEM.CUSTOM_FIELD1>
    </USER_DEFINED_EXTENSIONS>
  </HEADER>
  <T_NEW_CATALOG>
    <ARTICLE_TO_CATALOGGROUP_MAP><ART_ID>A2</ART_ID><CATALOG_GROUP_ID>G1</CATALOG_GROUP_ID></ARTICLE_TO_CATALOGGROUP_MAP>
    <CATALOG_GROUP_SYSTEM>
      <CATALOG_STRUCTURE type="root"><GROUP_ID>G0</GROUP_ID><GROUP_NAME>Root</GROUP_NAME></CATALOG_STRUCTURE>
      <CATALOG_STRUCTURE type="leaf"><GROUP_ID>G1</GROUP_ID><GROUP_NAME>Leaf</GROUP_NAME><PARENT_ID>G0</PARENT_ID></CATALOG_STRUCTURE>
    </CATALOG_GROUP_SYSTEM>
    <ARTICLE><SUPPLIER_AID>A1</SUPPLIER_AID></ARTICLE>
    <ARTICLE>
      <SUPPLIER_AID>A2</SUPPLIER_AID>
      <USER_DEFINED_EXTENSIONS><UDX.COLOR>red</UDX.COLOR></USER_DEFINED_EXTENSIONS>
    </ARTICLE>
    <ARTICLE_TO_CATALOGGROUP_MAP><ART_ID>A2</ART_ID><CATALOG_GROUP_ID>G0</CATALOG_GROUP_ID></ARTICLE_TO_CATALOGGROUP_MAP>
  </T_NEW_CATALOG>
</BMECAT>"#;

    fn reader(xml: &str) -> Reader<Cursor<Vec<u8>>> {
        Reader::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[test]
    fn test_header_counters_and_udx() {
        let headers = RefCell::new(Vec::new());
        let handlers = Handlers::new().on_header(|h| {
            headers.borrow_mut().push(h);
            Ok(())
        });

        reader(CATALOG).run(&CancelContext::new(), handlers).unwrap();

        let headers = headers.into_inner();
        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert_eq!(header.catalog.id, "C1");
        assert_eq!(header.number_of_articles, 2);
        assert_eq!(header.number_of_catalog_groups, 2);
        assert_eq!(header.number_of_classification_groups, 0);
        assert_eq!(header.number_of_article_to_catalog_group_maps, 1);
        assert_eq!(
            header.udx.as_ref().unwrap().get("SYSTEM.CUSTOM_FIELD1"),
            Some("A")
        );
    }

    #[test]
    fn test_articles_receive_group_ids_from_both_sides() {
        let articles = RefCell::new(Vec::new());
        let handlers = Handlers::new().on_article(|a| {
            articles.borrow_mut().push(a);
            Ok(())
        });

        reader(CATALOG).run(&CancelContext::new(), handlers).unwrap();

        let articles = articles.into_inner();
        assert_eq!(articles.len(), 2);
        assert!(articles[0].catalog_group_ids.is_empty());
        assert_eq!(articles[1].catalog_group_ids, vec!["G1", "G0"]);
        assert_eq!(articles[1].udx.as_ref().unwrap().get("COLOR"), Some("red"));
    }

    #[test]
    fn test_end_of_stream_from_header_stops_cleanly() {
        let articles = RefCell::new(0usize);
        let completed = RefCell::new(false);
        let handlers = Handlers::new()
            .on_header(|_| Err(HandlerError::EndOfStream))
            .on_article(|_| {
                *articles.borrow_mut() += 1;
                Ok(())
            })
            .on_complete(|| *completed.borrow_mut() = true);

        reader(CATALOG).run(&CancelContext::new(), handlers).unwrap();

        assert_eq!(*articles.borrow(), 0);
        assert!(*completed.borrow());
    }

    #[test]
    fn test_header_failure_propagates() {
        let handlers = Handlers::new().on_header(|_| Err(HandlerError::failed("no thanks")));
        let err = reader(CATALOG)
            .run(&CancelContext::new(), handlers)
            .unwrap_err();

        match err {
            BmecatError::Handler { element, id, .. } => {
                assert_eq!(element, "HEADER");
                assert_eq!(id, "C1");
            }
            other => panic!("Expected handler error, got {:?}", other),
        }
    }

    #[test]
    fn test_article_handler_error_carries_id() {
        let handlers = Handlers::new().on_article(|a| {
            if a.supplier_aid == "A2" {
                Err(HandlerError::failed("bad article"))
            } else {
                Ok(())
            }
        });
        let err = reader(CATALOG)
            .run(&CancelContext::new(), handlers)
            .unwrap_err();

        match err {
            BmecatError::Handler { element, id, .. } => {
                assert_eq!(element, "ARTICLE");
                assert_eq!(id, "A2");
            }
            other => panic!("Expected handler error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_groups_dispatched_in_order() {
        let groups = RefCell::new(Vec::new());
        let handlers = Handlers::new().on_catalog_group(|g| {
            groups.borrow_mut().push(g);
            Ok(())
        });

        reader(CATALOG).run(&CancelContext::new(), handlers).unwrap();

        let groups = groups.into_inner();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].is_root());
        assert_eq!(groups[0].parent_id, None);
        assert_eq!(groups[1].parent_id.as_deref(), Some("G0"));
    }

    #[test]
    fn test_cancelled_before_run() {
        let cancel = CancelContext::new();
        cancel.cancel();

        let called = RefCell::new(false);
        let handlers = Handlers::new().on_header(|_| {
            *called.borrow_mut() = true;
            Ok(())
        });
        let err = reader(CATALOG).run(&cancel, handlers).unwrap_err();

        assert!(err.is_cancelled());
        assert!(!*called.borrow());
    }

    #[test]
    fn test_cancel_from_handler_stops_within_one_step() {
        let cancel = CancelContext::new();
        let seen = RefCell::new(0usize);
        let handlers = Handlers::new().on_article(|_| {
            *seen.borrow_mut() += 1;
            cancel.cancel();
            Ok(())
        });

        let err = reader(CATALOG).run(&cancel, handlers).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_malformed_document() {
        let xml = "<BMECAT><T_NEW_CATALOG><ARTICLE></T_NEW_CATALOG></BMECAT>";
        let err = reader(xml).run(&CancelContext::new(), Handlers::new()).unwrap_err();
        assert!(matches!(err, BmecatError::Xml { pass: 1, .. }));
    }

    #[test]
    fn test_unknown_encoding() {
        let xml = r#"<?xml version="1.0" encoding="x-klingon"?><BMECAT/>"#;
        let err = reader(xml).run(&CancelContext::new(), Handlers::new()).unwrap_err();
        assert!(matches!(err, BmecatError::UnknownEncoding(name) if name == "x-klingon"));
    }

    #[test]
    fn test_cp437_document() {
        let mut bytes = br#"<?xml version="1.0" encoding="CP437"?>
<BMECAT version="1.2"><T_NEW_CATALOG><ARTICLE><SUPPLIER_AID>Gr"#
            .to_vec();
        bytes.extend_from_slice(&[0x94, 0xE1, 0x65]);
        bytes.extend_from_slice(b"</SUPPLIER_AID></ARTICLE></T_NEW_CATALOG></BMECAT>");

        let mut ids = Vec::new();
        Reader::new(Cursor::new(bytes))
            .run(
                &CancelContext::new(),
                Handlers::new().on_article(|a| {
                    ids.push(a.supplier_aid);
                    Ok(())
                }),
            )
            .unwrap();
        assert_eq!(ids, vec!["Größe".to_string()]);
    }

    /// Seeks succeed, reads fail once more than `healthy_seeks` rewinds happened.
    struct FailingReads {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
        healthy_seeks: usize,
    }

    impl Read for FailingReads {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.seeks > self.healthy_seeks {
                return Err(std::io::Error::other("device unplugged"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for FailingReads {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    fn failing_reads(healthy_seeks: usize) -> Reader<FailingReads> {
        Reader::new(FailingReads {
            inner: Cursor::new(CATALOG.as_bytes().to_vec()),
            seeks: 0,
            healthy_seeks,
        })
    }

    #[test]
    fn test_declaration_read_failure_names_pass() {
        let err = failing_reads(0)
            .run(&CancelContext::new(), Handlers::new())
            .unwrap_err();
        match err {
            BmecatError::Declaration { pass, source } => {
                assert_eq!(pass, 1);
                assert_eq!(source.to_string(), "device unplugged");
            }
            other => panic!("Expected declaration error, got {:?}", other),
        }

        // Pass 1 rewinds twice; the next rewind starts pass 2.
        let err = failing_reads(2)
            .run(&CancelContext::new(), Handlers::new())
            .unwrap_err();
        assert!(matches!(err, BmecatError::Declaration { pass: 2, .. }));
    }

    #[test]
    fn test_progress_reports_both_passes() {
        let passes = Arc::new(Mutex::new(Vec::new()));
        let sink = passes.clone();
        let options = ReaderOptions::default().with_progress(Arc::new(move |p: ReadProgress| {
            sink.lock().unwrap().push(p.pass);
        }));

        let mut reader = Reader::with_options(Cursor::new(CATALOG.as_bytes().to_vec()), options);
        reader.run(&CancelContext::new(), Handlers::new()).unwrap();

        let passes = passes.lock().unwrap();
        assert!(passes.contains(&1));
        assert!(passes.contains(&2));
        assert_eq!(passes.first(), Some(&1));
        assert_eq!(passes.last(), Some(&2));
    }

    #[test]
    fn test_throttle_allows_first_call_only_within_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(3600));
        assert!(throttle.allow());
        assert!(!throttle.allow());

        let mut unthrottled = Throttle::new(Duration::ZERO);
        assert!(unthrottled.allow());
        assert!(unthrottled.allow());
    }
}
