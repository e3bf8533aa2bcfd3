//! `StoreCollection` trait 实现

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde_json::json;

use crate::error::{RemoteError, Result};
use crate::traits::{ErrorContext, RemoteErrorMapper, StoreCollection, check_batch_size};
use crate::types::{RecordPage, StoreRecord, StoreRecordPatch};

use super::codec::{document_to_record, patch_to_fields, record_to_fields};
use super::types::{
    AggregationItem, CommitRequest, Document, ListDocumentsResponse, RunQueryItem, Value, Write,
};
use super::{COUNT_ALIAS, FirestoreCollection, LIST_PAGE_SIZE};

impl FirestoreCollection {
    fn decode(&self, doc: &Document) -> Result<StoreRecord> {
        document_to_record(doc).map_err(|e| self.parse_error(e))
    }

    fn missing_id(&self) -> RemoteError {
        RemoteError::InvalidParameter {
            backend: self.backend_name().to_string(),
            param: "id".to_string(),
            detail: "record has no id".to_string(),
        }
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        let _: IgnoredAny = self
            .send_json(
                self.client.post(self.rpc_url("commit")),
                &CommitRequest { writes },
                "POST",
                &format!("commit ({count} writes)"),
                ErrorContext::default(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreCollection for FirestoreCollection {
    fn id(&self) -> &'static str {
        "firestore"
    }

    async fn count(&self) -> Result<u64> {
        let body = json!({
            "structuredAggregationQuery": {
                "structuredQuery": {
                    "from": [{ "collectionId": self.config.collection_id }]
                },
                "aggregations": [{ "alias": COUNT_ALIAS, "count": {} }]
            }
        });
        let items: Vec<AggregationItem> = self
            .send_json(
                self.client.post(self.rpc_url("runAggregationQuery")),
                &body,
                "POST",
                "runAggregationQuery",
                ErrorContext::default(),
            )
            .await?;

        let value = items
            .iter()
            .find_map(|item| item.result.as_ref())
            .and_then(|result| result.aggregate_fields.get(COUNT_ALIAS))
            .ok_or_else(|| self.parse_error("aggregation response has no count"))?;

        match value {
            Value::IntegerValue(n) => n.parse::<u64>().map_err(|e| self.parse_error(e)),
            other => Err(self.parse_error(format!("unexpected count value: {other:?}"))),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<StoreRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let response: ListDocumentsResponse = self
                .send(
                    self.client.get(self.collection_url()).query(&query),
                    "GET",
                    &self.config.collection_id,
                    ErrorContext::default(),
                )
                .await?;

            for doc in &response.documents {
                records.push(self.decode(doc)?);
            }

            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        log::debug!("[firestore] fetched {} records", records.len());
        Ok(records)
    }

    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> Result<RecordPage> {
        if page_size == 0 {
            return Ok(RecordPage::new(Vec::new(), page_size));
        }

        let mut query = json!({
            "from": [{ "collectionId": self.config.collection_id }],
            "orderBy": [{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }],
            "limit": page_size,
        });
        if let Some(cursor) = cursor {
            query["startAt"] = json!({
                "values": [{ "referenceValue": self.document_name(cursor) }],
                "before": false,
            });
        }

        let items: Vec<RunQueryItem> = self
            .send_json(
                self.client.post(self.rpc_url("runQuery")),
                &json!({ "structuredQuery": query }),
                "POST",
                "runQuery",
                ErrorContext::default(),
            )
            .await?;

        let records = items
            .iter()
            .filter_map(|item| item.document.as_ref())
            .map(|doc| self.decode(doc))
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordPage::new(records, page_size))
    }

    async fn put(&self, record: &StoreRecord) -> Result<()> {
        if !record.has_id() {
            return Err(self.missing_id());
        }
        let doc = Document {
            name: None,
            fields: record_to_fields(record),
        };
        let _: IgnoredAny = self
            .send_json(
                self.client.patch(self.document_url(&record.id)),
                &doc,
                "PATCH",
                &record.id,
                ErrorContext::for_record(&record.id),
            )
            .await?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: &StoreRecordPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut query: Vec<(&str, &str)> = patch
            .field_paths()
            .into_iter()
            .map(|path| ("updateMask.fieldPaths", path))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let doc = Document {
            name: None,
            fields: patch_to_fields(patch),
        };
        let _: IgnoredAny = self
            .send_json(
                self.client.patch(self.document_url(id)).query(&query),
                &doc,
                "PATCH",
                id,
                ErrorContext::for_record(id),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _: IgnoredAny = self
            .send(
                self.client.delete(self.document_url(id)),
                "DELETE",
                id,
                ErrorContext::for_record(id),
            )
            .await?;
        Ok(())
    }

    async fn batch_write(&self, records: &[StoreRecord]) -> Result<()> {
        check_batch_size(self.id(), records.len())?;
        let writes = records
            .iter()
            .map(|record| {
                if record.has_id() {
                    Ok(Write::Update(Document {
                        name: Some(self.document_name(&record.id)),
                        fields: record_to_fields(record),
                    }))
                } else {
                    Err(self.missing_id())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        self.commit(writes).await
    }

    async fn batch_delete(&self, ids: &[String]) -> Result<()> {
        check_batch_size(self.id(), ids.len())?;
        let writes = ids
            .iter()
            .map(|id| Write::Delete(self.document_name(id)))
            .collect();
        self.commit(writes).await
    }
}
