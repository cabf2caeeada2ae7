use serde::{Deserialize, Serialize};

pub const MIME_TYPE_URL: &str = "url";
pub const MIME_TYPE_PDF: &str = "application/pdf";
pub const MIME_TYPE_JPEG: &str = "image/jpeg";
pub const MIME_TYPE_GIF: &str = "image/gif";
pub const MIME_TYPE_HTML: &str = "text/html";
pub const MIME_TYPE_PLAIN: &str = "text/plain";

pub const MIME_PURPOSE_THUMBNAIL: &str = "thumbnail";
pub const MIME_PURPOSE_NORMAL: &str = "normal";
pub const MIME_PURPOSE_DETAIL: &str = "detail";
pub const MIME_PURPOSE_DATA_SHEET: &str = "data_sheet";
pub const MIME_PURPOSE_LOGO: &str = "logo";
pub const MIME_PURPOSE_OTHERS: &str = "others";
pub const MIME_PURPOSE_ICON: &str = "icon";
pub const MIME_PURPOSE_SAFETY_DATA_SHEET: &str = "safety_data_sheet";

pub(crate) fn is_zero(n: &i32) -> bool {
    *n == 0
}

/// `MIME_INFO`: media assets attached to an article or supplier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MimeInfo {
    #[serde(rename = "MIME", default)]
    pub mimes: Vec<Mime>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mime {
    #[serde(rename = "MIME_TYPE", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "MIME_SOURCE", default)]
    pub source: String,
    #[serde(rename = "MIME_DESCR", default, skip_serializing_if = "String::is_empty")]
    pub descr: String,
    #[serde(rename = "MIME_ALT", default, skip_serializing_if = "String::is_empty")]
    pub alt: String,
    #[serde(rename = "MIME_PURPOSE", default, skip_serializing_if = "String::is_empty")]
    pub purpose: String,
    #[serde(rename = "MIME_ORDER", default, skip_serializing_if = "is_zero")]
    pub order: i32,
}

impl MimeInfo {
    /// Source of the first asset with the given purpose, or `""`.
    pub fn source_for(&self, purpose: &str) -> &str {
        self.mimes
            .iter()
            .find(|m| m.purpose == purpose)
            .map_or("", |m| m.source.as_str())
    }

    pub fn thumbnail_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_THUMBNAIL)
    }

    pub fn normal_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_NORMAL)
    }

    pub fn detail_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_DETAIL)
    }

    pub fn data_sheet_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_DATA_SHEET)
    }

    pub fn logo_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_LOGO)
    }

    pub fn icon_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_ICON)
    }

    pub fn safety_data_sheet_source(&self) -> &str {
        self.source_for(MIME_PURPOSE_SAFETY_DATA_SHEET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mime(purpose: &str, source: &str) -> Mime {
        Mime {
            kind: MIME_TYPE_JPEG.to_string(),
            source: source.to_string(),
            purpose: purpose.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_match_wins() {
        let info = MimeInfo {
            mimes: vec![
                mime(MIME_PURPOSE_NORMAL, "a.jpg"),
                mime(MIME_PURPOSE_THUMBNAIL, "thumb.jpg"),
                mime(MIME_PURPOSE_NORMAL, "b.jpg"),
            ],
        };
        assert_eq!(info.normal_source(), "a.jpg");
        assert_eq!(info.thumbnail_source(), "thumb.jpg");
        assert_eq!(info.logo_source(), "");
    }

    #[test]
    fn test_decode_mime_info() {
        let xml = r#"<MIME_INFO>
            <MIME>
                <MIME_TYPE>application/pdf</MIME_TYPE>
                <MIME_SOURCE>sheet.pdf</MIME_SOURCE>
                <MIME_PURPOSE>data_sheet</MIME_PURPOSE>
                <MIME_ORDER>2</MIME_ORDER>
            </MIME>
        </MIME_INFO>"#;

        let info: MimeInfo = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(info.mimes.len(), 1);
        assert_eq!(info.mimes[0].kind, MIME_TYPE_PDF);
        assert_eq!(info.mimes[0].order, 2);
        assert_eq!(info.data_sheet_source(), "sheet.pdf");
        assert_eq!(info.safety_data_sheet_source(), "");
    }

    #[test]
    fn test_encode_skips_zero_values() {
        let xml = quick_xml::se::to_string_with_root("MIME", &mime(MIME_PURPOSE_ICON, "i.gif"))
            .unwrap();
        assert!(xml.contains("<MIME_SOURCE>i.gif</MIME_SOURCE>"));
        assert!(!xml.contains("MIME_ORDER"));
        assert!(!xml.contains("MIME_DESCR"));
    }
}
