//! 任务模型
//!
//! 一次用户触发对应一个 Job，由调度器独占执行，
//! 终态事件投递后即被丢弃，不做持久化

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

/// 任务标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 分析类型选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeSelection {
    pub text: bool,
    pub image: bool,
    pub pdf: bool,
}

impl AnalyzeSelection {
    pub fn is_empty(&self) -> bool {
        !(self.text || self.image || self.pdf)
    }
}

/// 综合分析请求（文本 / 图片 / PDF 任意组合）
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub selection: AnalyzeSelection,
    pub text: String,
    pub image_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
}

/// 任务类型
#[derive(Debug, Clone)]
pub enum JobKind {
    /// 竞品素材分析（子步骤按 文本 → 图片 → PDF 顺序执行）
    Analyze(AnalyzeRequest),
    /// 演示用 URL 解析
    ParseUrl { url: String },
}

/// 任务状态机：Pending → Running → {Succeeded | Failed}，不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// 一个任务
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Pending,
        }
    }
}

/// 任务产出：各子步骤名 → 服务返回的 JSON
pub type JobOutput = serde_json::Map<String, Value>;

/// 任务事件
///
/// 每个任务先投递一次 Running，之后恰好投递一个终态事件
#[derive(Debug)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: JobEventKind,
}

#[derive(Debug)]
pub enum JobEventKind {
    Running,
    Succeeded(JobOutput),
    Failed(String),
}
