//! 共享测试工具和辅助函数

#![allow(dead_code)]

use serde_json::{Value, json};
use store_tracker_remote::{FirestoreCollection, FirestoreConfig, StoreRecord, emulator_base_url};
use wiremock::MockServer;

pub const PROJECT: &str = "demo";
pub const DOCUMENTS: &str = "projects/demo/databases/(default)/documents";

/// 跳过测试的宏（未配置模拟器时）
#[macro_export]
macro_rules! skip_if_no_emulator {
    () => {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_err() {
            eprintln!("跳过测试: 缺少环境变量 FIRESTORE_EMULATOR_HOST");
            return;
        }
    };
}

/// 断言 `Option` 为 `Some`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// 指向 mock server 的集合
pub fn mock_collection(server: &MockServer) -> FirestoreCollection {
    let mut config = FirestoreConfig::new(PROJECT);
    config.base_url = Some(format!("{}/v1", server.uri()));
    config.id_token = Some("test-token".to_string());
    require_collection(config)
}

/// 指向本地模拟器的集合（每个测试使用独立集合）
pub fn emulator_collection(collection_id: &str) -> Option<FirestoreCollection> {
    let host = std::env::var("FIRESTORE_EMULATOR_HOST").ok()?;
    let mut config = FirestoreConfig::new(PROJECT);
    config.base_url = Some(emulator_base_url(&host));
    config.collection_id = collection_id.to_string();
    config.id_token = Some("owner".to_string());
    FirestoreCollection::new(config).ok()
}

fn require_collection(config: FirestoreConfig) -> FirestoreCollection {
    match FirestoreCollection::new(config) {
        Ok(c) => c,
        Err(e) => panic!("collection construction failed: {e}"),
    }
}

/// 文档资源名
pub fn document_name(id: &str) -> String {
    format!("{DOCUMENTS}/stores/{id}")
}

/// 构造 REST 形式的文档
pub fn document_json(id: &str, name: &str, prefecture: &str, visited: bool) -> Value {
    json!({
        "name": document_name(id),
        "fields": {
            "id": { "stringValue": id },
            "name": { "stringValue": name },
            "prefecture": { "stringValue": prefecture },
            "visited": { "booleanValue": visited },
            "visitCount": { "integerValue": if visited { "1" } else { "0" } },
            "visitDate": { "nullValue": null }
        }
    })
}

/// 测试用记录
pub fn sample_record(id: &str) -> StoreRecord {
    StoreRecord {
        id: id.to_string(),
        name: format!("Store {id}"),
        prefecture: "東京都".to_string(),
        city: "渋谷区".to_string(),
        ..Default::default()
    }
}

/// Google 错误包
pub fn error_json(code: u16, status: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message, "status": status } })
}
