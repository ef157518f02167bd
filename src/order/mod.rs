//! Detection order model
//!
//! An [`Order`] is a list of detection groups; each group lists the
//! buildpacks tried together. The legacy [`V1Order`] is the same data in the
//! shape older consumers read from the builder metadata (`groups`).

pub mod resolve;

pub use resolve::{resolve_order, validate_buildpacks};

use serde::{Deserialize, Serialize};

use crate::buildpack::BuildpackInfo;

/// Reference to a buildpack from a detection group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackRef {
    pub id: String,

    /// Empty until resolved against the buildpacks known to the builder
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl BuildpackRef {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn info(&self) -> BuildpackInfo {
        BuildpackInfo::new(self.id.clone(), self.version.clone())
    }
}

/// One detection group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    #[serde(default)]
    pub group: Vec<BuildpackRef>,
}

impl OrderEntry {
    pub fn new(group: Vec<BuildpackRef>) -> Self {
        Self { group }
    }
}

/// Ordered list of detection groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order(Vec<OrderEntry>);

impl Order {
    pub fn new(entries: Vec<OrderEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every reference of every group, in order
    pub fn refs(&self) -> impl Iterator<Item = &BuildpackRef> {
        self.0.iter().flat_map(|entry| entry.group.iter())
    }

    /// Convert to the legacy `groups` representation
    pub fn to_v1_order(&self) -> V1Order {
        V1Order(
            self.0
                .iter()
                .map(|entry| V1Group {
                    buildpacks: entry.group.clone(),
                })
                .collect(),
        )
    }
}

/// Legacy detection group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1Group {
    #[serde(default)]
    pub buildpacks: Vec<BuildpackRef>,
}

/// Legacy order, as stored in the builder metadata `groups`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct V1Order(pub Vec<V1Group>);

impl V1Order {
    pub fn to_order(&self) -> Order {
        Order(
            self.0
                .iter()
                .map(|group| OrderEntry {
                    group: group.buildpacks.clone(),
                })
                .collect(),
        )
    }
}

/// `order.toml` as read by lifecycles from 0.4.0 on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderToml {
    #[serde(default)]
    pub order: Order,
}

/// `order.toml` as read by lifecycles before 0.4.0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1OrderToml {
    #[serde(default)]
    pub groups: V1Order,
}
