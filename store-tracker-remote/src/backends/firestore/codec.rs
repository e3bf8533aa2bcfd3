//! `StoreRecord` ↔ Firestore 字段转换

use serde_json::{Map, Number, Value as Json};

use crate::backends::common::document_id_from_name;
use crate::types::{StoreRecord, StoreRecordPatch};

use super::types::{Document, Fields, Value};

fn string(v: &str) -> Value {
    Value::StringValue(v.to_string())
}

fn date(v: Option<&str>) -> Value {
    v.map_or(Value::NullValue(()), string)
}

/// 完整记录 → 字段表（`id` 同时保存在文档内）
pub fn record_to_fields(record: &StoreRecord) -> Fields {
    let mut fields = Fields::new();
    fields.insert("id".into(), string(&record.id));
    fields.insert("name".into(), string(&record.name));
    fields.insert("zipcode".into(), string(&record.zipcode));
    fields.insert("prefecture".into(), string(&record.prefecture));
    fields.insert("city".into(), string(&record.city));
    fields.insert("streetAddress".into(), string(&record.street_address));
    fields.insert("building".into(), string(&record.building));
    fields.insert("visited".into(), Value::BooleanValue(record.visited));
    fields.insert("visitDate".into(), date(record.visit_date.as_deref()));
    fields.insert(
        "visitCount".into(),
        Value::IntegerValue(record.visit_count.to_string()),
    );
    fields.insert("favorite".into(), Value::BooleanValue(record.favorite));
    fields.insert("closed".into(), Value::BooleanValue(record.closed));
    fields.insert("memo".into(), string(&record.memo));
    fields
}

/// 部分更新 → 仅包含被修改字段的字段表
pub fn patch_to_fields(patch: &StoreRecordPatch) -> Fields {
    let mut fields = Fields::new();
    let strings = [
        ("name", &patch.name),
        ("zipcode", &patch.zipcode),
        ("prefecture", &patch.prefecture),
        ("city", &patch.city),
        ("streetAddress", &patch.street_address),
        ("building", &patch.building),
        ("memo", &patch.memo),
    ];
    for (key, value) in strings {
        if let Some(v) = value {
            fields.insert(key.into(), string(v));
        }
    }
    let flags = [
        ("visited", patch.visited),
        ("favorite", patch.favorite),
        ("closed", patch.closed),
    ];
    for (key, value) in flags {
        if let Some(v) = value {
            fields.insert(key.into(), Value::BooleanValue(v));
        }
    }
    if let Some(v) = &patch.visit_date {
        fields.insert("visitDate".into(), date(v.as_deref()));
    }
    if let Some(v) = patch.visit_count {
        fields.insert("visitCount".into(), Value::IntegerValue(v.to_string()));
    }
    fields
}

/// 字段值 → 普通 JSON，交给 `StoreRecord` 的宽松反序列化处理
fn to_json(value: &Value) -> Json {
    match value {
        Value::NullValue(()) => Json::Null,
        Value::BooleanValue(b) => Json::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map_or_else(|_| Json::String(s.clone()), |n| Json::Number(n.into())),
        Value::DoubleValue(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::StringValue(s)
        | Value::TimestampValue(s)
        | Value::ReferenceValue(s)
        | Value::BytesValue(s) => Json::String(s.clone()),
        Value::GeoPointValue(v) | Value::ArrayValue(v) | Value::MapValue(v) => v.clone(),
    }
}

/// 文档 → 记录
///
/// 记录 ID 取资源名的最后一段（文档的真实键），没有资源名时才使用文档内的 `id` 字段。
pub fn document_to_record(doc: &Document) -> Result<StoreRecord, serde_json::Error> {
    let mut object: Map<String, Json> = doc
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();

    if let Some(name) = &doc.name {
        object.insert(
            "id".into(),
            Json::String(document_id_from_name(name).to_string()),
        );
    }

    serde_json::from_value(Json::Object(object))
}
