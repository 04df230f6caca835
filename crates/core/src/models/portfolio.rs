use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stock::StockEntry;

/// One portfolio file's worth of holdings: a named, independent set of
/// symbols with their purchase lots.
///
/// Symbols live in a `BTreeMap` so the alphabetical order required for
/// display and for file rewrites is structural, not re-sorted ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Unique key; defaults to the file stem when the file omits it.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unvested portfolios (e.g., unexercised grants) are excluded from
    /// aggregation unless explicitly included.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unvested: bool,

    pub stocks: BTreeMap<String, StockEntry>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            unvested: false,
            stocks: BTreeMap::new(),
        }
    }
}
