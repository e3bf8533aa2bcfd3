//! 店铺数据导入导出（JSON / CSV）

use chrono::{DateTime, Utc};
use serde_json::Value;
use store_tracker_remote::lenient;

use crate::error::{CoreError, CoreResult};
use crate::types::{DataFormat, ExportFile, StoreRecord};
use crate::utils::datetime::file_stamp;

/// CSV 导出列（顺序固定）
pub const CSV_COLUMNS: [&str; 13] = [
    "id",
    "name",
    "zipcode",
    "prefecture",
    "city",
    "streetAddress",
    "building",
    "visited",
    "visitDate",
    "visitCount",
    "favorite",
    "closed",
    "memo",
];

/// Converts between record sequences and interchange files.
///
/// Parsing produces records that are ready for the bulk engine: an import in
/// either format is rejected as a whole unless every entry carries an id. Ids
/// are trimmed and every parsed record is normalized.
pub struct ImportExportService;

impl ImportExportService {
    /// 按格式解析文件内容
    pub fn parse(content: &str, format: DataFormat) -> CoreResult<Vec<StoreRecord>> {
        let records = match format {
            DataFormat::Json => Self::parse_json(content)?,
            DataFormat::Csv => Self::parse_csv(content)?,
        };
        log::info!("Parsed {} records from {format:?}", records.len());
        Ok(records)
    }

    /// JSON 数组 → 记录
    pub fn parse_json(content: &str) -> CoreResult<Vec<StoreRecord>> {
        let value: Value = serde_json::from_str(strip_bom(content))
            .map_err(|e| CoreError::ImportExportError(format!("无效的 JSON 文件: {e}")))?;

        let Value::Array(items) = value else {
            return Err(CoreError::ImportExportError(
                "JSON must be an array of stores".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mut record: StoreRecord = serde_json::from_value(item).map_err(|e| {
                CoreError::ImportExportError(format!("Entry {index}: {e}"))
            })?;
            record.id = record.id.trim().to_string();
            if !record.has_id() {
                return Err(CoreError::ImportExportError(format!(
                    "Entry {index} has no id"
                )));
            }
            records.push(record.normalized());
        }
        Ok(records)
    }

    /// CSV（首行为表头）→ 记录
    ///
    /// 未知列被忽略；缺失列取默认值。
    pub fn parse_csv(content: &str) -> CoreResult<Vec<StoreRecord>> {
        let rows = parse_csv_rows(strip_bom(content))?;
        let mut rows = rows.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();

        let mut records = Vec::new();
        for (line, row) in rows.enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let row_number = line + 2;
            let mut record = StoreRecord::default();
            for (column, cell) in header.iter().zip(row) {
                set_csv_field(&mut record, column, cell).map_err(|detail| {
                    CoreError::ImportExportError(format!("Row {row_number}: {detail}"))
                })?;
            }
            if !record.has_id() {
                return Err(CoreError::ImportExportError(format!(
                    "Row {row_number} has no id"
                )));
            }
            records.push(record.normalized());
        }
        Ok(records)
    }

    /// 按格式导出
    pub fn export(records: &[StoreRecord], format: DataFormat) -> CoreResult<ExportFile> {
        let content = match format {
            DataFormat::Json => Self::to_json(records)?,
            DataFormat::Csv => Self::to_csv(records),
        };
        Ok(ExportFile {
            content,
            suggested_filename: format.default_filename().to_string(),
        })
    }

    /// 备份文件（JSON，文件名带时间戳）
    pub fn backup(records: &[StoreRecord], taken_at: &DateTime<Utc>) -> CoreResult<ExportFile> {
        Ok(ExportFile {
            content: Self::to_json(records)?,
            suggested_filename: format!("backup-{}.json", file_stamp(taken_at)),
        })
    }

    fn to_json(records: &[StoreRecord]) -> CoreResult<String> {
        serde_json::to_string_pretty(records)
            .map_err(|e| CoreError::SerializationError(e.to_string()))
    }

    fn to_csv(records: &[StoreRecord]) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, CSV_COLUMNS.iter().map(|c| (*c).to_string()));
        for r in records {
            push_csv_row(
                &mut out,
                [
                    r.id.clone(),
                    r.name.clone(),
                    r.zipcode.clone(),
                    r.prefecture.clone(),
                    r.city.clone(),
                    r.street_address.clone(),
                    r.building.clone(),
                    r.visited.to_string(),
                    r.visit_date.clone().unwrap_or_default(),
                    r.visit_count.to_string(),
                    r.favorite.to_string(),
                    r.closed.to_string(),
                    r.memo.clone(),
                ],
            );
        }
        out
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

fn push_csv_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let line: Vec<String> = cells
        .into_iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn set_csv_field(record: &mut StoreRecord, column: &str, cell: String) -> Result<(), String> {
    match column {
        "id" => record.id = cell.trim().to_string(),
        "name" => record.name = cell,
        "zipcode" => record.zipcode = cell,
        "prefecture" => record.prefecture = cell,
        "city" => record.city = cell,
        "streetAddress" => record.street_address = cell,
        "building" => record.building = cell,
        "visited" => record.visited = parse_flag(column, &cell)?,
        "favorite" => record.favorite = parse_flag(column, &cell)?,
        "closed" => record.closed = parse_flag(column, &cell)?,
        "visitCount" => {
            record.visit_count = lenient::parse_count(&cell)
                .ok_or_else(|| format!("invalid visitCount '{cell}'"))?;
        }
        "visitDate" => record.visit_date = lenient::non_empty(cell),
        "memo" => record.memo = cell,
        _ => {}
    }
    Ok(())
}

fn parse_flag(column: &str, cell: &str) -> Result<bool, String> {
    lenient::parse_flag(cell).ok_or_else(|| format!("invalid {column} '{cell}'"))
}

/// Splits CSV text into rows of cells.
///
/// Quoted cells may contain commas, line breaks and `""` escapes. `\r\n` and
/// `\n` both end a row.
fn parse_csv_rows(content: &str) -> CoreResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    cell.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err(CoreError::ImportExportError(
            "Unterminated quoted field".to_string(),
        ));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    Ok(rows)
}
