use serde::{Deserialize, Serialize};

use crate::mime::{MimeInfo, is_zero};

/// Position of a group in the catalog tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Root,
    Node,
    Leaf,
}

/// `CATALOG_STRUCTURE`: one node of the catalog group tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogGroup {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupType>,
    #[serde(rename = "GROUP_ID", default)]
    pub id: String,
    #[serde(rename = "GROUP_NAME", default)]
    pub name: String,
    #[serde(rename = "GROUP_DESCRIPTION", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// `None` when the group has no parent, which differs from an empty `PARENT_ID`.
    #[serde(rename = "PARENT_ID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "GROUP_ORDER", default, skip_serializing_if = "is_zero")]
    pub order: i32,
    #[serde(rename = "MIME_INFO", default, skip_serializing_if = "Option::is_none")]
    pub mime_info: Option<MimeInfo>,
    #[serde(rename = "KEYWORD", default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl CatalogGroup {
    pub fn is_root(&self) -> bool {
        self.kind == Some(GroupType::Root)
    }

    pub fn is_node(&self) -> bool {
        self.kind == Some(GroupType::Node)
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == Some(GroupType::Leaf)
    }
}

/// `CATALOG_GROUP_SYSTEM`: the catalog group tree as a flat, ordered list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupSystem {
    #[serde(rename = "GROUP_SYSTEM_ID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "GROUP_SYSTEM_NAME", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "CATALOG_STRUCTURE", default)]
    pub groups: Vec<CatalogGroup>,
}

impl GroupSystem {
    /// A system without groups is not written.
    pub fn is_blank(&self) -> bool {
        self.groups.is_empty()
    }
}

/// `ARTICLE_TO_CATALOGGROUP_MAP`: assigns an article to a catalog group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleToCatalogGroupMap {
    #[serde(rename = "ART_ID", default)]
    pub article_id: String,
    #[serde(rename = "CATALOG_GROUP_ID", default)]
    pub catalog_group_id: String,
    #[serde(rename = "ARTICLE_TO_CATALOGGROUP_MAP_ORDER", default, skip_serializing_if = "is_zero")]
    pub order: i32,
}
