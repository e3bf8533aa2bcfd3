//! 店舗查询、新增与统计类型

use serde::{Deserialize, Serialize};

/// Input for creating a store; the id is assigned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    #[serde(default)]
    pub zipcode: String,
    pub prefecture: String,
    pub city: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub memo: String,
}

/// Search filter over an in-memory record list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFilter {
    /// Exact prefecture match.
    pub prefecture: Option<String>,
    /// Exact city match.
    pub city: Option<String>,
    /// Only visited stores.
    #[serde(default)]
    pub visited_only: bool,
    /// Only favorites.
    #[serde(default)]
    pub favorite_only: bool,
    /// Include closed stores (hidden by default).
    #[serde(default)]
    pub show_closed: bool,
    /// Case-insensitive substring of name, city or street address.
    pub text: Option<String>,
}

/// Visit progress for one prefecture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefectureStats {
    pub prefecture: String,
    pub visited: usize,
    pub total: usize,
    /// Percentage with one decimal.
    pub rate: f64,
}

/// Overall visit progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    /// Stores not marked closed.
    pub open_total: usize,
    /// Visited stores among the open ones.
    pub visited_open: usize,
    /// Percentage with one decimal.
    pub visited_rate: f64,
    /// Per-prefecture breakdown, in prefecture code order.
    pub prefectures: Vec<PrefectureStats>,
}
