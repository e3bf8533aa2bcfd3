//! Firestore REST backend

mod codec;
mod collection;
mod error;
mod http;
mod types;

use reqwest::Client;

use crate::backends::common::{create_http_client, normalize_base_url};
use crate::error::Result;
use crate::types::FirestoreConfig;

pub(crate) const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";
/// `fetch_all` 单页文档数
pub(crate) const LIST_PAGE_SIZE: u32 = 300;
/// 计数聚合的别名
pub(crate) const COUNT_ALIAS: &str = "total";

/// Store collection backed by Cloud Firestore (REST v1).
pub struct FirestoreCollection {
    pub(crate) client: Client,
    pub(crate) config: FirestoreConfig,
    pub(crate) base_url: String,
}

impl FirestoreCollection {
    pub fn new(config: FirestoreConfig) -> Result<Self> {
        let base_url = normalize_base_url(config.base_url.as_deref().unwrap_or(FIRESTORE_API_BASE));
        Ok(Self {
            client: create_http_client("firestore")?,
            config,
            base_url,
        })
    }

    /// `projects/{p}/databases/{d}/documents`
    pub(crate) fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.config.project_id, self.config.database_id
        )
    }

    /// Full resource name of one document.
    pub(crate) fn document_name(&self, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_root(),
            self.config.collection_id,
            id
        )
    }

    /// URL of one document; the id is percent-encoded.
    pub(crate) fn document_url(&self, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            self.documents_root(),
            self.config.collection_id,
            urlencoding::encode(id)
        )
    }

    /// URL of the collection (list endpoint).
    pub(crate) fn collection_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.documents_root(),
            self.config.collection_id
        )
    }

    /// URL of a database-level RPC such as `runQuery` or `commit`.
    pub(crate) fn rpc_url(&self, method: &str) -> String {
        format!("{}/{}:{method}", self.base_url, self.documents_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> FirestoreCollection {
        let mut config = FirestoreConfig::new("demo");
        config.base_url = Some("http://localhost:8080/v1/".to_string());
        FirestoreCollection::new(config).unwrap()
    }

    #[test]
    fn resource_names() {
        let c = collection();
        assert_eq!(
            c.document_name("a1"),
            "projects/demo/databases/(default)/documents/stores/a1"
        );
        assert_eq!(
            c.rpc_url("commit"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn document_url_encodes_id() {
        let c = collection();
        assert!(c.document_url("a b").ends_with("/stores/a%20b"));
    }
}
