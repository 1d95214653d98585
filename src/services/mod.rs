//! 业务能力层
//!
//! 每个服务只描述「我能做什么」，不关心任务流程

pub mod analysis;
pub mod history;
pub mod image_meta;
pub mod page_parser;

pub use analysis::AnalysisOrchestrator;
pub use history::HistoryStore;
