//! Character set handling for catalogs not encoded in UTF-8.
//!
//! The encoding named in the XML declaration is resolved to an [`encoding_rs`]
//! codec, or to the IBM PC code page 437 table which `encoding_rs` lacks, and
//! the byte stream is transcoded to UTF-8 before it reaches the tokenizer.

use std::fmt;
use std::io::{self, Read};

use codepage_437::CP437_CONTROL;
use encoding_rs::{CoderResult, Decoder, Encoding};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{BmecatError, Result};

/// A non-UTF-8 character set the reader can transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Codec(&'static Encoding),
    Cp437,
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Codec(encoding) => encoding.name(),
            Charset::Cp437 => "IBM437",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a declared encoding name to a charset. `Ok(None)` means UTF-8 passthrough.
pub type CharsetResolver = fn(&str) -> Result<Option<Charset>>;

/// Number of leading bytes inspected for the XML declaration.
const SNIFF_LEN: u64 = 1024;

/// Default registry of supported charset names (case-insensitive).
pub fn resolve(label: &str) -> Result<Option<Charset>> {
    let enc = label.trim().to_lowercase();

    let encoding = match enc.as_str() {
        "" | "utf-8" | "utf8" => return Ok(None),
        "ibm code page 437" | "cp437" | "cp-437" | "ibm437" | "ibm-437" => {
            return Ok(Some(Charset::Cp437));
        }
        "ibm code page 866" | "cp866" | "cp-866" => encoding_rs::IBM866,
        // Latin-1 documents are decoded with the windows-1252 superset.
        "iso88591" | "iso 8859-1" | "iso8859-1" | "iso-8859-1" => encoding_rs::WINDOWS_1252,
        "iso88592" | "iso 8859-2" | "iso8859-2" | "iso-8859-2" => encoding_rs::ISO_8859_2,
        "iso88593" | "iso 8859-3" | "iso8859-3" | "iso-8859-3" => encoding_rs::ISO_8859_3,
        "iso88594" | "iso 8859-4" | "iso8859-4" | "iso-8859-4" => encoding_rs::ISO_8859_4,
        "iso88595" | "iso 8859-5" | "iso8859-5" | "iso-8859-5" => encoding_rs::ISO_8859_5,
        "iso88596" | "iso 8859-6" | "iso8859-6" | "iso-8859-6" => encoding_rs::ISO_8859_6,
        "iso88597" | "iso 8859-7" | "iso8859-7" | "iso-8859-7" => encoding_rs::ISO_8859_7,
        "iso88598" | "iso 8859-8" | "iso8859-8" | "iso-8859-8" => encoding_rs::ISO_8859_8,
        "iso885910" | "iso 8859-10" | "iso8859-10" | "iso-8859-10" => encoding_rs::ISO_8859_10,
        "iso885913" | "iso 8859-13" | "iso8859-13" | "iso-8859-13" => encoding_rs::ISO_8859_13,
        "iso885914" | "iso 8859-14" | "iso8859-14" | "iso-8859-14" => encoding_rs::ISO_8859_14,
        "iso885915" | "iso 8859-15" | "iso8859-15" | "iso-8859-15" => encoding_rs::ISO_8859_15,
        "iso885916" | "iso 8859-16" | "iso8859-16" | "iso-8859-16" => encoding_rs::ISO_8859_16,
        "windows1252" | "windows-1252" => encoding_rs::WINDOWS_1252,
        _ => return Err(BmecatError::UnknownEncoding(label.to_string())),
    };

    Ok(Some(Charset::Codec(encoding)))
}

/// Read the `encoding` pseudo-attribute of the XML declaration, if any.
///
/// Consumes up to [`SNIFF_LEN`] bytes from `source`; callers rewind afterwards.
pub fn sniff_declared_encoding<R: Read>(source: R) -> io::Result<Option<String>> {
    let mut prefix = Vec::new();
    source.take(SNIFF_LEN).read_to_end(&mut prefix)?;

    let mut reader = Reader::from_reader(prefix.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                return Ok(match decl.encoding() {
                    Some(Ok(name)) => Some(String::from_utf8_lossy(&name).into_owned()),
                    _ => None,
                });
            }
            // Leading whitespace or comments before the declaration are not allowed,
            // so anything else means there is no declaration at all.
            Ok(Event::Text(_)) => {}
            _ => return Ok(None),
        }
        buf.clear();
    }
}

/// Streams `inner` through an `encoding_rs` decoder, producing UTF-8.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    raw: Box<[u8]>,
    raw_pos: usize,
    raw_len: usize,
    decoded: Box<[u8]>,
    decoded_pos: usize,
    decoded_len: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_without_bom_handling(),
            raw: vec![0u8; 8 * 1024].into_boxed_slice(),
            raw_pos: 0,
            raw_len: 0,
            decoded: vec![0u8; 16 * 1024].into_boxed_slice(),
            decoded_pos: 0,
            decoded_len: 0,
            eof: false,
            finished: false,
        }
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.decoded_pos < self.decoded_len {
                let n = buf.len().min(self.decoded_len - self.decoded_pos);
                buf[..n].copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + n]);
                self.decoded_pos += n;
                return Ok(n);
            }
            if self.finished || buf.is_empty() {
                return Ok(0);
            }

            if self.raw_pos == self.raw_len && !self.eof {
                let n = self.inner.read(&mut self.raw)?;
                self.raw_pos = 0;
                self.raw_len = n;
                self.eof = n == 0;
            }

            let (result, read, written, _) = self.decoder.decode_to_utf8(
                &self.raw[self.raw_pos..self.raw_len],
                &mut self.decoded,
                self.eof,
            );
            self.raw_pos += read;
            self.decoded_pos = 0;
            self.decoded_len = written;

            // The decoder must not be called again once it saw the last input.
            if self.eof && result == CoderResult::InputEmpty {
                self.finished = true;
            }
        }
    }
}

/// Streams code page 437 bytes as UTF-8. Bytes below 0x20 stay control characters.
pub struct Cp437Reader<R> {
    inner: R,
    raw: Box<[u8]>,
    decoded: Vec<u8>,
    decoded_pos: usize,
}

impl<R: Read> Cp437Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            raw: vec![0u8; 8 * 1024].into_boxed_slice(),
            decoded: Vec::with_capacity(24 * 1024),
            decoded_pos: 0,
        }
    }
}

impl<R: Read> Read for Cp437Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.decoded_pos == self.decoded.len() {
            if buf.is_empty() {
                return Ok(0);
            }
            let n = self.inner.read(&mut self.raw)?;
            if n == 0 {
                return Ok(0);
            }

            self.decoded.clear();
            self.decoded_pos = 0;
            let mut utf8 = [0u8; 4];
            for &byte in &self.raw[..n] {
                let ch = CP437_CONTROL.decode(byte);
                self.decoded.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
        }

        let n = buf.len().min(self.decoded.len() - self.decoded_pos);
        buf[..n].copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + n]);
        self.decoded_pos += n;
        Ok(n)
    }
}

/// Wrap `source` so that it yields UTF-8, according to the resolved `charset`.
pub fn decoding_reader<'a, R: Read + 'a>(
    source: R,
    charset: Option<Charset>,
) -> Box<dyn Read + 'a> {
    match charset {
        Some(Charset::Codec(encoding)) => Box::new(DecodingReader::new(source, encoding)),
        Some(Charset::Cp437) => Box::new(Cp437Reader::new(source)),
        None => Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_utf8_passthrough() {
        assert!(resolve("").unwrap().is_none());
        assert!(resolve("UTF-8").unwrap().is_none());
        assert!(resolve("utf8").unwrap().is_none());
    }

    #[test]
    fn test_resolve_registry() {
        let codec = |encoding| Some(Charset::Codec(encoding));
        assert_eq!(resolve("ISO-8859-1").unwrap(), codec(encoding_rs::WINDOWS_1252));
        assert_eq!(resolve("iso8859-15").unwrap(), codec(encoding_rs::ISO_8859_15));
        assert_eq!(resolve("CP866").unwrap(), codec(encoding_rs::IBM866));
        assert_eq!(resolve("windows-1252").unwrap(), codec(encoding_rs::WINDOWS_1252));
    }

    #[test]
    fn test_resolve_cp437() {
        assert_eq!(resolve("CP437").unwrap(), Some(Charset::Cp437));
        assert_eq!(resolve("IBM437").unwrap(), Some(Charset::Cp437));
        assert_eq!(resolve("IBM Code Page 437").unwrap(), Some(Charset::Cp437));
        assert_eq!(Charset::Cp437.to_string(), "IBM437");
    }

    #[test]
    fn test_resolve_unknown_encoding() {
        match resolve("EBCDIC-FOO") {
            Err(BmecatError::UnknownEncoding(name)) => assert_eq!(name, "EBCDIC-FOO"),
            other => panic!("Expected UnknownEncoding, got {:?}", other),
        }
    }

    #[test]
    fn test_sniff_declared_encoding() {
        let xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?><BMECAT/>"#;
        assert_eq!(
            sniff_declared_encoding(&xml[..]).unwrap(),
            Some("ISO-8859-1".to_string())
        );

        let no_encoding = br#"<?xml version="1.0"?><BMECAT/>"#;
        assert_eq!(sniff_declared_encoding(&no_encoding[..]).unwrap(), None);

        let no_decl = br#"<BMECAT/>"#;
        assert_eq!(sniff_declared_encoding(&no_decl[..]).unwrap(), None);
    }

    #[test]
    fn test_decoding_reader_transcodes_latin1() {
        // "Größe" in ISO-8859-1
        let latin1: &[u8] = &[0x47, 0x72, 0xF6, 0xDF, 0x65];
        let mut reader = DecodingReader::new(latin1, encoding_rs::WINDOWS_1252);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "Größe");
    }

    #[test]
    fn test_cp437_reader_transcodes() {
        // "Größe\t½" in code page 437
        let cp437: &[u8] = &[0x47, 0x72, 0x94, 0xE1, 0x65, 0x09, 0xAB];
        let mut out = String::new();
        Cp437Reader::new(cp437).read_to_string(&mut out).unwrap();
        assert_eq!(out, "Größe\t½");
    }

    #[test]
    fn test_cp437_reader_small_buffers() {
        let cp437: &[u8] = &[0x81, 0x84, 0x94];
        let mut reader = decoding_reader(cp437, Some(Charset::Cp437));
        let mut out = Vec::new();
        let mut chunk = [0u8; 1];
        while reader.read(&mut chunk).unwrap() > 0 {
            out.push(chunk[0]);
        }
        assert_eq!(String::from_utf8(out).unwrap(), "üäö");
    }
}
