use serde::{Deserialize, Serialize};

/// Position of a classification group in its tree. There is no root type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationGroupType {
    Node,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Synonyms {
    #[serde(rename = "SYNONYM", default)]
    pub items: Vec<String>,
}

/// `CLASSIFICATION_GROUP`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationGroup {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ClassificationGroupType>,
    #[serde(rename = "@level", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(rename = "CLASSIFICATION_GROUP_ID", default)]
    pub id: String,
    #[serde(rename = "CLASSIFICATION_GROUP_NAME", default)]
    pub name: String,
    #[serde(rename = "CLASSIFICATION_GROUP_DESCR", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "CLASSIFICATION_GROUP_SYNONYMS", default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Synonyms>,
    #[serde(rename = "CLASSIFICATION_GROUP_PARENT_ID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl ClassificationGroup {
    pub fn is_node(&self) -> bool {
        self.kind == Some(ClassificationGroupType::Node)
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == Some(ClassificationGroupType::Leaf)
    }

    pub fn synonyms(&self) -> &[String] {
        self.synonyms.as_ref().map_or(&[], |s| s.items.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationGroups {
    #[serde(rename = "CLASSIFICATION_GROUP", default)]
    pub groups: Vec<ClassificationGroup>,
}

/// `CLASSIFICATION_SYSTEM`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationSystem {
    #[serde(rename = "CLASSIFICATION_SYSTEM_NAME", default)]
    pub name: String,
    #[serde(rename = "CLASSIFICATION_SYSTEM_FULLNAME", default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    #[serde(rename = "CLASSIFICATION_SYSTEM_VERSION", default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "CLASSIFICATION_SYSTEM_DESCR", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "CLASSIFICATION_GROUPS", default)]
    pub groups: ClassificationGroups,
}

impl ClassificationSystem {
    /// A system without groups is not written.
    pub fn is_blank(&self) -> bool {
        self.groups.groups.is_empty()
    }
}
