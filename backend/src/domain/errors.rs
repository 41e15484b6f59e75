//! Error taxonomy for the reconciliation core.
//!
//! Two scopes, two propagation policies:
//!
//! - [`CsvError`] is row-scoped. During batch operations these are collected
//!   into per-row error records and never abort the batch.
//! - [`ImportError`] is bundle-scoped. Any of these aborts the whole import
//!   and triggers restoration from the pre-import backup snapshot;
//!   [`ImportError::RollbackFailed`] is the single condition the core cannot
//!   recover from locally.

use thiserror::Error;

/// Row-scoped parse/validation failure in the CSV pipeline.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV解析失败：{0}")]
    Parse(String),

    #[error("日期格式错误：\"{value}\"。支持格式：YYYY/M/D、YYYY-MM-DD、YYYY.M.D")]
    DateFormat { value: String },

    #[error("日期无效：{value}（月份或日期超出范围）")]
    InvalidDate { value: String },

    #[error("{field}格式错误：应为\"{true_text}\"或\"{false_text}\"，实际为\"{value}\"")]
    BooleanFormat {
        field: String,
        true_text: String,
        false_text: String,
        value: String,
    },

    #[error("{field}必须是数字（当前值：\"{value}\"）")]
    NumberFormat { field: String, value: String },

    #[error("CSV文件缺少必需列：{0}")]
    MissingColumns(String),
}

/// Bundle-scoped failure during whole-dataset import/export.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("暂无数据可导出，请先添加车辆和记录")]
    NoData,

    #[error("数据结构错误：{0}")]
    Structural(String),

    #[error("版本不兼容：导入版本 {bundle}，当前版本 {current}")]
    VersionMismatch { bundle: String, current: String },

    #[error("{record_kind}引用了不存在的车辆：{vehicle_id}")]
    DanglingReference {
        record_kind: String,
        vehicle_id: String,
    },

    #[error("导入后数据验证失败：{0}")]
    VerificationFailed(String),

    #[error("存储操作失败：{0}")]
    Storage(#[from] anyhow::Error),

    /// The import failed *and* restoring the backup failed. Data may be
    /// corrupt; requires manual intervention.
    #[error("导入失败且回滚失败，请手动恢复数据：{reason}")]
    RollbackFailed { reason: String },
}

impl ImportError {
    /// Whether the pre-import snapshot was restored successfully. Used by the
    /// UI layer to append the fixed "data restored" / "rollback failed"
    /// suffix to its one-line failure message.
    pub fn rolled_back(&self) -> bool {
        !matches!(self, ImportError::RollbackFailed { .. })
    }
}
