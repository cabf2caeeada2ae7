//! Document `HEADER` and the records nested in it.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::date_time::{
    DATE_TIME_AGREEMENT_END_DATE, DATE_TIME_AGREEMENT_START_DATE, DateBounds, DateTime,
    find_date_or,
};
use crate::mime::MimeInfo;
use crate::udx::Extensions;

pub const PRICE_FLAG_INCL_FREIGHT: &str = "incl_freight";
pub const PRICE_FLAG_INCL_PACKING: &str = "incl_packing";
pub const PRICE_FLAG_INCL_ASSURANCE: &str = "incl_assurance";
pub const PRICE_FLAG_INCL_DUTY: &str = "incl_duty";

/// The catalog header.
///
/// The four `number_of_*` counters are not part of the document. The reader fills
/// them in from its first pass before the header is handed out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "GENERATOR_INFO", default, skip_serializing_if = "String::is_empty")]
    pub generator_info: String,
    #[serde(rename = "CATALOG", default)]
    pub catalog: Catalog,
    #[serde(rename = "BUYER", default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<Buyer>,
    #[serde(rename = "AGREEMENT", default, skip_serializing_if = "Vec::is_empty")]
    pub agreements: Vec<Agreement>,
    #[serde(rename = "SUPPLIER", default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Supplier>,
    #[serde(skip)]
    pub udx: Option<Extensions>,

    #[serde(skip)]
    pub number_of_articles: usize,
    #[serde(skip)]
    pub number_of_catalog_groups: usize,
    #[serde(skip)]
    pub number_of_classification_groups: usize,
    #[serde(skip)]
    pub number_of_article_to_catalog_group_maps: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "LANGUAGE", default)]
    pub language: String,
    #[serde(rename = "CATALOG_ID", default)]
    pub id: String,
    #[serde(rename = "CATALOG_VERSION", default)]
    pub version: String,
    #[serde(rename = "CATALOG_NAME", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "DATETIME", default, skip_serializing_if = "Option::is_none")]
    pub generation_date: Option<DateTime>,
    #[serde(rename = "TERRITORY", default, skip_serializing_if = "Vec::is_empty")]
    pub territories: Vec<String>,
    #[serde(rename = "CURRENCY", default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
    #[serde(rename = "MIME_ROOT", default, skip_serializing_if = "String::is_empty")]
    pub mime_root: String,
    #[serde(rename = "PRICE_FLAG", default, skip_serializing_if = "Vec::is_empty")]
    pub price_flags: Vec<PriceFlag>,
}

/// `PRICE_FLAG`: whether catalog prices include freight, packing and the like.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceFlag {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl PriceFlag {
    fn enabled(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: "true".to_string(),
        }
    }

    pub fn includes_freight() -> Self {
        Self::enabled(PRICE_FLAG_INCL_FREIGHT)
    }

    pub fn includes_packing() -> Self {
        Self::enabled(PRICE_FLAG_INCL_PACKING)
    }

    pub fn includes_assurance() -> Self {
        Self::enabled(PRICE_FLAG_INCL_ASSURANCE)
    }

    pub fn includes_duty() -> Self {
        Self::enabled(PRICE_FLAG_INCL_DUTY)
    }

    pub fn is_set(&self) -> bool {
        self.value.trim() == "true"
    }
}

/// A typed identifier such as `BUYER_ID type="duns"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdRef {
    #[serde(rename = "@type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Buyer {
    #[serde(rename = "BUYER_ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IdRef>,
    #[serde(rename = "BUYER_NAME", default)]
    pub name: String,
    #[serde(rename = "ADDRESS", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(rename = "SUPPLIER_ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IdRef>,
    #[serde(rename = "SUPPLIER_NAME", default)]
    pub name: String,
    #[serde(rename = "ADDRESS", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "MIME_INFO", default, skip_serializing_if = "Option::is_none")]
    pub mime_info: Option<MimeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "NAME", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "NAME2", default, skip_serializing_if = "String::is_empty")]
    pub name2: String,
    #[serde(rename = "NAME3", default, skip_serializing_if = "String::is_empty")]
    pub name3: String,
    #[serde(rename = "CONTACT", default, skip_serializing_if = "String::is_empty")]
    pub contact: String,
    #[serde(rename = "STREET", default, skip_serializing_if = "String::is_empty")]
    pub street: String,
    #[serde(rename = "ZIP", default, skip_serializing_if = "String::is_empty")]
    pub zip: String,
    #[serde(rename = "BOXNO", default, skip_serializing_if = "String::is_empty")]
    pub box_no: String,
    #[serde(rename = "ZIPBOX", default, skip_serializing_if = "String::is_empty")]
    pub zip_box: String,
    #[serde(rename = "CITY", default, skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(rename = "STATE", default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(rename = "COUNTRY", default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(rename = "PHONE", default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(rename = "FAX", default, skip_serializing_if = "String::is_empty")]
    pub fax: String,
    #[serde(rename = "EMAIL", default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(rename = "PUBLIC_KEY", default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
    #[serde(rename = "URL", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "ADDRESS_REMARKS", default, skip_serializing_if = "String::is_empty")]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Agreement {
    #[serde(rename = "@type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "@default", default, skip_serializing_if = "String::is_empty")]
    pub default: String,
    #[serde(rename = "AGREEMENT_ID", default)]
    pub id: String,
    #[serde(rename = "DATETIME", default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateTime>,
}

impl Agreement {
    /// Start of the agreement, or `bounds.start` when absent or malformed.
    pub fn start_date(&self, bounds: &DateBounds) -> chrono::DateTime<Utc> {
        find_date_or(&self.dates, DATE_TIME_AGREEMENT_START_DATE, bounds.start)
    }

    /// End of the agreement, or `bounds.end` when absent or malformed.
    pub fn end_date(&self, bounds: &DateBounds) -> chrono::DateTime<Utc> {
        find_date_or(&self.dates, DATE_TIME_AGREEMENT_END_DATE, bounds.end)
    }
}
