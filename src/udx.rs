//! `USER_DEFINED_EXTENSIONS` codec.
//!
//! The field name lives in the element tag (`<UDX.SYSTEM.CUSTOM_FIELD1>`), which
//! the declarative serde mapping cannot express, so both directions are written
//! against the raw event API.

use std::io::{BufRead, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

pub const EXTENSIONS_TAG: &str = "USER_DEFINED_EXTENSIONS";
const FIELD_PREFIX: &str = "UDX.";

/// A single extension field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionField {
    /// Name without the `UDX.` prefix.
    pub name: String,
    /// Text content, unescaped.
    pub value: String,
    /// Inner markup as found in the document. Only set when reading.
    pub inner_xml: String,
    /// Write `value` verbatim instead of escaping it.
    pub raw: bool,
}

/// Ordered list of extension fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extensions {
    pub fields: Vec<ExtensionField>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field whose value is escaped on output.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(ExtensionField {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        });
    }

    /// Append a field whose value is injected as-is. The caller must supply well-formed XML.
    pub fn add_raw(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(ExtensionField {
            name: name.into(),
            value: value.into(),
            raw: true,
            ..Default::default()
        });
    }

    /// Text value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Inner XML of the first field called `name`.
    pub fn get_inner_xml(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.inner_xml.as_str())
    }

    /// Write the wrapper element and one `UDX.<name>` child per field.
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        writer.write_event(Event::Start(BytesStart::new(EXTENSIONS_TAG)))?;
        for field in &self.fields {
            let tag = format!("{FIELD_PREFIX}{}", field.name);
            writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
            let text = if field.raw {
                BytesText::from_escaped(field.value.as_str())
            } else {
                BytesText::new(field.value.as_str())
            };
            writer.write_event(Event::Text(text))?;
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(EXTENSIONS_TAG)))?;
        Ok(())
    }

    /// Decode the children of a wrapper whose start tag was just consumed from `reader`.
    ///
    /// Returns after the matching end tag. Children without the `UDX.` prefix are skipped.
    pub fn read_from<B: BufRead>(reader: &mut Reader<B>) -> quick_xml::Result<Self> {
        let mut extensions = Extensions::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    match local.strip_prefix(FIELD_PREFIX) {
                        Some(name) => {
                            let name = name.to_string();
                            extensions.fields.push(read_field(reader, name)?);
                        }
                        None => skip_element(reader)?,
                    }
                }
                Event::Empty(e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if let Some(name) = local.strip_prefix(FIELD_PREFIX) {
                        extensions.fields.push(ExtensionField {
                            name: name.to_string(),
                            ..Default::default()
                        });
                    }
                }
                Event::End(_) | Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(extensions)
    }

    /// Decode a standalone `<USER_DEFINED_EXTENSIONS>` fragment.
    pub fn from_xml(xml: &str) -> quick_xml::Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == EXTENSIONS_TAG.as_bytes() => {
                    return Extensions::read_from(&mut reader);
                }
                Event::Eof => return Ok(Extensions::new()),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Encode into a standalone fragment.
    pub fn to_xml(&self) -> quick_xml::Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn read_field<B: BufRead>(reader: &mut Reader<B>, name: String) -> quick_xml::Result<ExtensionField> {
    let mut value = String::new();
    let mut inner = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Text(t) if depth == 0 => value.push_str(&t.unescape()?),
            Event::CData(c) if depth == 0 => value.push_str(&String::from_utf8_lossy(c)),
            Event::Eof => break,
            _ => {}
        }
        inner.write_event(event)?;
        buf.clear();
    }

    Ok(ExtensionField {
        name,
        value,
        inner_xml: String::from_utf8_lossy(&inner.into_inner()).into_owned(),
        raw: false,
    })
}

fn skip_element<B: BufRead>(reader: &mut Reader<B>) -> quick_xml::Result<()> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(()),
            Event::End(_) => depth -= 1,
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_custom_field() {
        let mut udx = Extensions::new();
        udx.add("SYSTEM.CUSTOM_FIELD1", "A");
        udx.add("SYSTEM.CUSTOM_FIELD2", "B");

        assert_eq!(
            udx.to_xml().unwrap(),
            "<USER_DEFINED_EXTENSIONS>\
             <UDX.SYSTEM.CUSTOM_FIELD1>A</UDX.SYSTEM.CUSTOM_FIELD1>\
             <UDX.SYSTEM.CUSTOM_FIELD2>B</UDX.SYSTEM.CUSTOM_FIELD2>\
             </USER_DEFINED_EXTENSIONS>"
        );
    }

    #[test]
    fn test_encode_escapes_plain_values() {
        let mut udx = Extensions::new();
        udx.add("NOTE", "a < b & c");
        assert!(
            udx.to_xml()
                .unwrap()
                .contains("<UDX.NOTE>a &lt; b &amp; c</UDX.NOTE>")
        );
    }

    #[test]
    fn test_encode_raw_value_verbatim() {
        let mut udx = Extensions::new();
        udx.add_raw("SYSTEM.PRODUCT_TYPE", "<TYPE id=\"1\">Tool</TYPE>");
        assert!(udx.to_xml().unwrap().contains(
            "<UDX.SYSTEM.PRODUCT_TYPE><TYPE id=\"1\">Tool</TYPE></UDX.SYSTEM.PRODUCT_TYPE>"
        ));
    }

    #[test]
    fn test_decode_custom_field() {
        let xml = r#"<USER_DEFINED_EXTENSIONS>
            <UDX.SYSTEM.CUSTOM_FIELD1>A</UDX.SYSTEM.CUSTOM_FIELD1>
            <OTHER>ignored</OTHER>
            <UDX.EMPTY/>
        </USER_DEFINED_EXTENSIONS>"#;

        let udx = Extensions::from_xml(xml).unwrap();
        assert_eq!(udx.fields.len(), 2);
        assert_eq!(udx.fields[0].name, "SYSTEM.CUSTOM_FIELD1");
        assert_eq!(udx.get("SYSTEM.CUSTOM_FIELD1"), Some("A"));
        assert_eq!(udx.get("EMPTY"), Some(""));
        assert_eq!(udx.get("OTHER"), None);
    }

    #[test]
    fn test_decode_keeps_inner_xml() {
        let xml = "<USER_DEFINED_EXTENSIONS>\
                   <UDX.EDXF.PRODUCT_CHARACTERISTICS><ITEM>1</ITEM><ITEM>2</ITEM></UDX.EDXF.PRODUCT_CHARACTERISTICS>\
                   <UDX.TEXT>x &amp; y</UDX.TEXT>\
                   </USER_DEFINED_EXTENSIONS>";

        let udx = Extensions::from_xml(xml).unwrap();
        assert_eq!(
            udx.get_inner_xml("EDXF.PRODUCT_CHARACTERISTICS"),
            Some("<ITEM>1</ITEM><ITEM>2</ITEM>")
        );
        assert_eq!(udx.get("EDXF.PRODUCT_CHARACTERISTICS"), Some(""));
        assert_eq!(udx.get("TEXT"), Some("x & y"));
        assert_eq!(udx.get_inner_xml("TEXT"), Some("x &amp; y"));
    }

    #[test]
    fn test_decode_stops_at_wrapper_end() {
        let xml = "<ROOT><USER_DEFINED_EXTENSIONS><UDX.A>1</UDX.A></USER_DEFINED_EXTENSIONS>\
                   <UDX.B>2</UDX.B></ROOT>";
        let udx = Extensions::from_xml(xml).unwrap();
        assert_eq!(udx.fields.len(), 1);
        assert_eq!(udx.get("B"), None);
    }
}
