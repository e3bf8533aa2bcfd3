use serde::{Deserialize, Serialize};

use crate::utils::lenient;

/// Maximum number of operations accepted by one batched write or delete.
pub const MAX_BATCH_SIZE: usize = 500;

/// Maximum memo length, in characters.
pub const MEMO_MAX_CHARS: usize = 500;

// ============ Store Record ============

/// One tracked store location.
///
/// `id` is the addressing key for every single-record remote operation and is
/// never changed after creation. Two invariants tie the visit fields together:
///
/// - `visited == false` ⇒ `visit_count == 0` and `visit_date == None`
/// - `visited == true` ⇒ `visit_count >= 1`
///
/// Deserialization is lenient (see [`lenient`]) so that records coming out of
/// spreadsheets or older exports load without a separate cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    /// Stable unique identifier.
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    /// Store name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Postal code; sort key within a region.
    #[serde(default, deserialize_with = "lenient::string")]
    pub zipcode: String,
    /// Prefecture; groups region statistics.
    #[serde(default, deserialize_with = "lenient::string")]
    pub prefecture: String,
    /// City / ward.
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    /// Street address.
    #[serde(default, deserialize_with = "lenient::string")]
    pub street_address: String,
    /// Building name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub building: String,
    /// Whether the store has been visited.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub visited: bool,
    /// Date of the last visit (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient::date")]
    pub visit_date: Option<String>,
    /// Number of visits.
    #[serde(default, deserialize_with = "lenient::count")]
    pub visit_count: u32,
    /// Marked as favorite.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub favorite: bool,
    /// Permanently closed. Deletion is only permitted when set.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub closed: bool,
    /// Free-form memo, at most [`MEMO_MAX_CHARS`] characters.
    #[serde(default, deserialize_with = "lenient::string")]
    pub memo: String,
}

impl StoreRecord {
    /// Whether the record carries a usable id.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Sets the visited flag, keeping the visit fields consistent.
    ///
    /// Clearing `visited` forces `visit_count = 0` and `visit_date = None`
    /// regardless of prior values. Setting it bumps a zero count to `1`.
    pub fn set_visited(&mut self, visited: bool) {
        self.visited = visited;
        if visited {
            if self.visit_count == 0 {
                self.visit_count = 1;
            }
        } else {
            self.visit_count = 0;
            self.visit_date = None;
        }
    }

    /// Returns the record with the visit invariant applied and the memo truncated.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let visited = self.visited;
        self.set_visited(visited);
        if self.memo.chars().count() > MEMO_MAX_CHARS {
            self.memo = self.memo.chars().take(MEMO_MAX_CHARS).collect();
        }
        self
    }

    /// Checks the record's invariants without modifying it.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if !self.has_id() {
            return Err(RecordValidationError::MissingId);
        }
        let memo_len = self.memo.chars().count();
        if memo_len > MEMO_MAX_CHARS {
            return Err(RecordValidationError::MemoTooLong {
                id: self.id.clone(),
                length: memo_len,
            });
        }
        if !self.visited && (self.visit_count != 0 || self.visit_date.is_some()) {
            return Err(RecordValidationError::VisitWithoutVisited { id: self.id.clone() });
        }
        if self.visited && self.visit_count == 0 {
            return Err(RecordValidationError::VisitedWithoutCount { id: self.id.clone() });
        }
        Ok(())
    }

    /// Applies a partial update and returns the normalized result.
    ///
    /// `visited` is applied last so that clearing it always wins over a
    /// simultaneous `visit_count` / `visit_date` in the same patch.
    #[must_use]
    pub fn with_patch(&self, patch: &StoreRecordPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = &patch.name {
            next.name.clone_from(v);
        }
        if let Some(v) = &patch.zipcode {
            next.zipcode.clone_from(v);
        }
        if let Some(v) = &patch.prefecture {
            next.prefecture.clone_from(v);
        }
        if let Some(v) = &patch.city {
            next.city.clone_from(v);
        }
        if let Some(v) = &patch.street_address {
            next.street_address.clone_from(v);
        }
        if let Some(v) = &patch.building {
            next.building.clone_from(v);
        }
        if let Some(v) = &patch.visit_date {
            next.visit_date.clone_from(v);
        }
        if let Some(v) = patch.visit_count {
            next.visit_count = v;
        }
        if let Some(v) = patch.favorite {
            next.favorite = v;
        }
        if let Some(v) = patch.closed {
            next.closed = v;
        }
        if let Some(v) = &patch.memo {
            next.memo.clone_from(v);
        }
        let visited = patch.visited.unwrap_or(next.visited);
        next.set_visited(visited);
        next
    }
}

/// Partial update for a [`StoreRecord`]. `None` means "leave unchanged".
///
/// `visit_date` is doubly optional: `Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::patch_date"
    )]
    pub visit_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl StoreRecordPatch {
    /// Minimal patch that turns `before` into `after` (ids are not compared).
    pub fn between(before: &StoreRecord, after: &StoreRecord) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            name: changed(&before.name, &after.name),
            zipcode: changed(&before.zipcode, &after.zipcode),
            prefecture: changed(&before.prefecture, &after.prefecture),
            city: changed(&before.city, &after.city),
            street_address: changed(&before.street_address, &after.street_address),
            building: changed(&before.building, &after.building),
            visited: changed(&before.visited, &after.visited),
            visit_date: changed(&before.visit_date, &after.visit_date),
            visit_count: changed(&before.visit_count, &after.visit_count),
            favorite: changed(&before.favorite, &after.favorite),
            closed: changed(&before.closed, &after.closed),
            memo: changed(&before.memo, &after.memo),
        }
    }

    /// The record that results from applying this patch to `record`.
    #[must_use]
    pub fn apply_to(&self, record: &StoreRecord) -> StoreRecord {
        record.with_patch(self)
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Wire names of the fields this patch touches, in declaration order.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        let mut push = |present: bool, path: &'static str| {
            if present {
                paths.push(path);
            }
        };
        push(self.name.is_some(), "name");
        push(self.zipcode.is_some(), "zipcode");
        push(self.prefecture.is_some(), "prefecture");
        push(self.city.is_some(), "city");
        push(self.street_address.is_some(), "streetAddress");
        push(self.building.is_some(), "building");
        push(self.visited.is_some(), "visited");
        push(self.visit_date.is_some(), "visitDate");
        push(self.visit_count.is_some(), "visitCount");
        push(self.favorite.is_some(), "favorite");
        push(self.closed.is_some(), "closed");
        push(self.memo.is_some(), "memo");
        paths
    }
}

/// Record-level invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordValidationError {
    /// The record has no id.
    MissingId,
    /// The memo exceeds [`MEMO_MAX_CHARS`].
    MemoTooLong {
        /// Record id.
        id: String,
        /// Actual length in characters.
        length: usize,
    },
    /// Visit count or date present on an unvisited record.
    VisitWithoutVisited {
        /// Record id.
        id: String,
    },
    /// Visited record with a zero visit count.
    VisitedWithoutCount {
        /// Record id.
        id: String,
    },
}

impl std::fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "Record has no id"),
            Self::MemoTooLong { id, length } => write!(
                f,
                "Record '{id}': memo is {length} characters (max {MEMO_MAX_CHARS})"
            ),
            Self::VisitWithoutVisited { id } => {
                write!(f, "Record '{id}': visit data present but not visited")
            }
            Self::VisitedWithoutCount { id } => {
                write!(f, "Record '{id}': visited with a zero visit count")
            }
        }
    }
}

impl std::error::Error for RecordValidationError {}

// ============ Paging ============

/// One bounded slice of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    /// Records in this page, ordered by id.
    pub records: Vec<StoreRecord>,
    /// Whether another page may follow.
    ///
    /// Computed as `records.len() == page_size`, so a full final page reports
    /// `true` and the next fetch returns empty.
    pub has_more: bool,
}

impl RecordPage {
    /// Build a page, deriving [`has_more`](Self::has_more) from the requested size.
    pub fn new(records: Vec<StoreRecord>, page_size: usize) -> Self {
        let has_more = page_size > 0 && records.len() == page_size;
        Self { records, has_more }
    }

    /// Id of the last record, for use as the next cursor.
    pub fn last_id(&self) -> Option<&str> {
        self.records.last().map(|r| r.id.as_str())
    }
}

// ============ Connection ============

/// Connection settings for a Firestore-backed collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Database id, normally `(default)`.
    #[serde(default = "FirestoreConfig::default_database")]
    pub database_id: String,
    /// Collection holding the store documents.
    #[serde(default = "FirestoreConfig::default_collection")]
    pub collection_id: String,
    /// Override of `https://firestore.googleapis.com/v1` (emulator, tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Web API key appended as `?key=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OAuth / Firebase ID token sent as a bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl FirestoreConfig {
    /// Config with default database and collection.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: Self::default_database(),
            collection_id: Self::default_collection(),
            base_url: None,
            api_key: None,
            id_token: None,
        }
    }

    fn default_database() -> String {
        "(default)".to_string()
    }

    fn default_collection() -> String {
        "stores".to_string()
    }
}
