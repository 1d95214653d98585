//! 数据模型定义

pub mod analysis;
pub mod history;
pub mod job;
pub mod schemas;

pub use analysis::{ImageAnalysis, ImageMetadata, TextAnalysis};
pub use history::HistoryEntry;
pub use job::{
    AnalyzeRequest, AnalyzeSelection, Job, JobEvent, JobEventKind, JobId, JobKind, JobOutput,
    JobStatus,
};
