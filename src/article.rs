//! `ARTICLE` and its nested blocks.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::date_time::{
    DATE_TIME_VALID_END_DATE, DATE_TIME_VALID_START_DATE, DateBounds, DateTime, find_date_or,
};
use crate::mime::{MimeInfo, is_zero};
use crate::udx::Extensions;

pub const ARTICLE_STATUS_BARGAIN: &str = "bargain";
pub const ARTICLE_STATUS_NEW_ARTICLE: &str = "new_article";
pub const ARTICLE_STATUS_OLD_ARTICLE: &str = "old_article";
pub const ARTICLE_STATUS_NEW: &str = "new";
pub const ARTICLE_STATUS_USED: &str = "used";
pub const ARTICLE_STATUS_REFURBISHED: &str = "refurbished";
pub const ARTICLE_STATUS_CORE_ARTICLE: &str = "core_article";
pub const ARTICLE_STATUS_OTHERS: &str = "others";

pub const PRICE_TYPE_NET_LIST: &str = "net_list";
pub const PRICE_TYPE_GROS_LIST: &str = "gros_list";
pub const PRICE_TYPE_NET_CUSTOMER: &str = "net_customer";
pub const PRICE_TYPE_NRP: &str = "nrp";
pub const PRICE_TYPE_NET_CUSTOMER_EXP: &str = "net_customer_exp";

pub const REFERENCE_TYPE_SPAREPART: &str = "sparepart";
pub const REFERENCE_TYPE_SIMILAR: &str = "similar";
pub const REFERENCE_TYPE_FOLLOWUP: &str = "followup";
pub const REFERENCE_TYPE_MANDATORY: &str = "mandatory";
pub const REFERENCE_TYPE_SELECT: &str = "select";
pub const REFERENCE_TYPE_DIFF_ORDERUNIT: &str = "diff_orderunit";
pub const REFERENCE_TYPE_ACCESSORIES: &str = "accessories";
pub const REFERENCE_TYPE_CONSISTS_OF: &str = "consists_of";
pub const REFERENCE_TYPE_OTHERS: &str = "others";

fn is_zero_f64(n: &f64) -> bool {
    *n == 0.0
}

/// What an update document does with an article. Absent means create or replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleMode {
    New,
    Update,
    Delete,
}

impl ArticleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleMode::New => "new",
            ArticleMode::Update => "update",
            ArticleMode::Delete => "delete",
        }
    }
}

/// A product, keyed by `SUPPLIER_AID`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "@mode", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ArticleMode>,
    #[serde(rename = "SUPPLIER_AID", default)]
    pub supplier_aid: String,
    #[serde(rename = "ARTICLE_DETAILS", default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ArticleDetails>,
    #[serde(rename = "ARTICLE_FEATURES", default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<ArticleFeatures>,
    #[serde(rename = "ARTICLE_ORDER_DETAILS", default, skip_serializing_if = "Option::is_none")]
    pub order_details: Option<ArticleOrderDetails>,
    #[serde(rename = "ARTICLE_PRICE_DETAILS", default, skip_serializing_if = "Vec::is_empty")]
    pub price_details: Vec<ArticlePriceDetails>,
    #[serde(rename = "MIME_INFO", default, skip_serializing_if = "Option::is_none")]
    pub mime_info: Option<MimeInfo>,
    #[serde(skip)]
    pub udx: Option<Extensions>,
    #[serde(rename = "ARTICLE_REFERENCE", default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ArticleReference>,

    /// Catalog groups this article is mapped to, in document order. Filled in by the reader only.
    #[serde(skip)]
    pub catalog_group_ids: Vec<String>,
}

/// A typed value such as `ARTICLE_STATUS type="core_article"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

pub type ArticleStatus = TypedValue;
pub type SpecialTreatmentClass = TypedValue;
pub type BuyerAid = TypedValue;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleDetails {
    #[serde(rename = "DESCRIPTION_SHORT", default)]
    pub description_short: String,
    #[serde(rename = "DESCRIPTION_LONG", default, skip_serializing_if = "String::is_empty")]
    pub description_long: String,
    #[serde(rename = "EAN", default, skip_serializing_if = "String::is_empty")]
    pub ean: String,
    #[serde(rename = "SUPPLIER_ALT_AID", default, skip_serializing_if = "String::is_empty")]
    pub supplier_alt_aid: String,
    #[serde(rename = "BUYER_AID", default, skip_serializing_if = "Vec::is_empty")]
    pub buyer_aids: Vec<BuyerAid>,
    #[serde(rename = "MANUFACTURER_AID", default, skip_serializing_if = "String::is_empty")]
    pub manufacturer_aid: String,
    #[serde(rename = "MANUFACTURER_NAME", default, skip_serializing_if = "String::is_empty")]
    pub manufacturer_name: String,
    #[serde(rename = "MANUFACTURER_TYPE_DESCR", default, skip_serializing_if = "String::is_empty")]
    pub manufacturer_type_descr: String,
    #[serde(rename = "ERP_GROUP_BUYER", default, skip_serializing_if = "String::is_empty")]
    pub erp_group_buyer: String,
    #[serde(rename = "ERP_GROUP_SUPPLIER", default, skip_serializing_if = "String::is_empty")]
    pub erp_group_supplier: String,
    #[serde(rename = "DELIVERY_TIME", default, skip_serializing_if = "is_zero_f64")]
    pub delivery_time: f64,
    #[serde(rename = "SPECIAL_TREATMENT_CLASS", default, skip_serializing_if = "Vec::is_empty")]
    pub special_treatment_classes: Vec<SpecialTreatmentClass>,
    #[serde(rename = "KEYWORD", default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(rename = "REMARKS", default, skip_serializing_if = "String::is_empty")]
    pub remarks: String,
    #[serde(rename = "SEGMENT", default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
    #[serde(rename = "ARTICLE_ORDER", default, skip_serializing_if = "is_zero")]
    pub article_order: i32,
    #[serde(rename = "ARTICLE_STATUS", default, skip_serializing_if = "Vec::is_empty")]
    pub article_status: Vec<ArticleStatus>,
}

/// `ARTICLE_FEATURES`: features of one reference feature system (eCl@ss, UNSPSC, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleFeatures {
    #[serde(rename = "REFERENCE_FEATURE_SYSTEM_NAME", default, skip_serializing_if = "String::is_empty")]
    pub feature_system_name: String,
    #[serde(rename = "REFERENCE_FEATURE_GROUP_ID", default, skip_serializing_if = "String::is_empty")]
    pub feature_group_id: String,
    #[serde(rename = "REFERENCE_FEATURE_GROUP_NAME", default, skip_serializing_if = "String::is_empty")]
    pub feature_group_name: String,
    #[serde(rename = "FEATURE", default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
}

impl ArticleFeatures {
    pub fn is_eclass(&self) -> bool {
        self.feature_system_name.to_uppercase().starts_with("ECLASS")
    }

    pub fn is_unspsc(&self) -> bool {
        self.feature_system_name.to_uppercase().starts_with("UNSPSC")
    }

    /// Version suffix of the system name, e.g. `5.1` for `ECLASS-5.1`.
    pub fn system_version(&self) -> &str {
        match self.feature_system_name.split_once('-') {
            Some((_, version)) => version,
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "FNAME", default)]
    pub name: String,
    #[serde(rename = "VARIANTS", default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<FeatureVariants>,
    #[serde(rename = "FVALUE", default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(rename = "FUNIT", default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(rename = "FORDER", default, skip_serializing_if = "is_zero")]
    pub order: i32,
    #[serde(rename = "FDESCR", default, skip_serializing_if = "String::is_empty")]
    pub descr: String,
    #[serde(rename = "FVALUE_DETAILS", default, skip_serializing_if = "String::is_empty")]
    pub value_details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureVariants {
    #[serde(rename = "VARIANT", default)]
    pub variants: Vec<FeatureVariant>,
    #[serde(rename = "VORDER", default, skip_serializing_if = "is_zero")]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureVariant {
    #[serde(rename = "FVALUE", default)]
    pub value: String,
    #[serde(rename = "SUPPLIER_AID_SUPPLEMENT", default)]
    pub supplier_aid_supplement: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleOrderDetails {
    #[serde(rename = "ORDER_UNIT", default)]
    pub order_unit: String,
    #[serde(rename = "CONTENT_UNIT", default, skip_serializing_if = "String::is_empty")]
    pub content_unit: String,
    #[serde(rename = "NO_CU_PER_OU", default, skip_serializing_if = "is_zero_f64")]
    pub no_cu_per_ou: f64,
    #[serde(rename = "PRICE_QUANTITY", default, skip_serializing_if = "is_zero_f64")]
    pub price_quantity: f64,
    #[serde(rename = "QUANTITY_MIN", default, skip_serializing_if = "is_zero_f64")]
    pub quantity_min: f64,
    #[serde(rename = "QUANTITY_INTERVAL", default, skip_serializing_if = "is_zero_f64")]
    pub quantity_interval: f64,
}

/// `ARTICLE_PRICE_DETAILS`: price tiers valid within a date range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticlePriceDetails {
    #[serde(rename = "DATETIME", default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateTime>,
    #[serde(rename = "DAILY_PRICE", default, skip_serializing_if = "String::is_empty")]
    pub daily_price: String,
    #[serde(rename = "ARTICLE_PRICE", default)]
    pub prices: Vec<ArticlePrice>,
}

impl ArticlePriceDetails {
    pub fn valid_start_date(&self, bounds: &DateBounds) -> chrono::DateTime<Utc> {
        find_date_or(&self.dates, DATE_TIME_VALID_START_DATE, bounds.start)
    }

    pub fn valid_end_date(&self, bounds: &DateBounds) -> chrono::DateTime<Utc> {
        find_date_or(&self.dates, DATE_TIME_VALID_END_DATE, bounds.end)
    }

    pub fn is_daily_price(&self) -> bool {
        matches!(
            self.daily_price.trim().to_uppercase().as_str(),
            "TRUE" | "1" | "T"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticlePrice {
    #[serde(rename = "@price_type", default, skip_serializing_if = "String::is_empty")]
    pub price_type: String,
    #[serde(rename = "PRICE_AMOUNT", default)]
    pub amount: f64,
    #[serde(rename = "PRICE_CURRENCY", default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
    #[serde(rename = "TAX", default, skip_serializing_if = "is_zero_f64")]
    pub tax: f64,
    #[serde(rename = "PRICE_FACTOR", default, skip_serializing_if = "is_zero_f64")]
    pub factor: f64,
    #[serde(rename = "LOWER_BOUND", default, skip_serializing_if = "is_zero_f64")]
    pub lower_bound: f64,
    #[serde(rename = "TERRITORY", default, skip_serializing_if = "Vec::is_empty")]
    pub territories: Vec<String>,
}

/// `ARTICLE_REFERENCE`: link to another article (spare part, accessory, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleReference {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "@quantity", default, skip_serializing_if = "is_zero_f64")]
    pub quantity: f64,
    #[serde(rename = "ART_ID_TO", default)]
    pub art_id_to: String,
    #[serde(rename = "CATALOG_ID", default, skip_serializing_if = "String::is_empty")]
    pub catalog_id: String,
    #[serde(rename = "CATALOG_VERSION", default, skip_serializing_if = "String::is_empty")]
    pub catalog_version: String,
}
