//! # Competitor Monitor
//!
//! 竞品监控助手：提交竞品素材（文本 / 图片 / PDF / URL），
//! 得到结构化的竞争分析结果。没有配置远程模型凭证时，
//! 分析自动降级到确定性的启发式结果
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（内嵌服务的端口与后台任务）
//! - `BackendServer` - 唯一的服务生命周期 owner，负责启动 / 就绪探测 / 停机
//! - `clients/` - 外部提供方客户端（GigaChat / Yandex Vision / Yandex Art）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `AnalysisOrchestrator` - 降级链分析能力（远程 → 解析 → 启发式）
//! - `HistoryStore` - 有界历史记录能力（最多 10 条，FIFO 淘汰）
//! - `image_meta` / `page_parser` - 图片摘要与页面抓取能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整处理流程
//! - `JobFlow` - 子步骤编排（校验 → 文本 → 图片 → PDF，首错中止）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 任务调度器，离线执行 + 终态事件投递
//! - `orchestrator/app` - 交互循环，消费事件并做触发防抖
//!
//! ## 模块结构

pub mod api;
pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AuthError, HistoryError, UpstreamError, ValidationError};
pub use infrastructure::{BackendServer, ServiceHandle};
pub use models::{
    AnalyzeRequest, AnalyzeSelection, Job, JobEvent, JobEventKind, JobId, JobKind, JobOutput,
};
pub use orchestrator::{App, JobDispatcher};
pub use services::{AnalysisOrchestrator, HistoryStore};
pub use workflow::JobFlow;
