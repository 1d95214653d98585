//! 内嵌分析服务（HTTP）
//!
//! 六个端点：analyze_text / analyze_image / ocr_image / ocr_pdf /
//! parse_demo / history。`GET /history` 同时兼作就绪探针

pub mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::clients::VisionClient;
use crate::config::Config;
use crate::services::{AnalysisOrchestrator, HistoryStore};

pub use error::ServiceError;

/// 上传体积上限（图片 / PDF）
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// 服务共享状态
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisOrchestrator>,
    pub vision: Arc<VisionClient>,
    pub history: Arc<HistoryStore>,
    pub chrome_executable: Option<PathBuf>,
}

impl AppState {
    /// 从配置装配全部服务
    pub fn from_config(config: &Config) -> Self {
        Self {
            analysis: Arc::new(AnalysisOrchestrator::new(&config.gigachat)),
            vision: Arc::new(VisionClient::new(&config.yandex)),
            history: Arc::new(HistoryStore::new(&config.history_path)),
            chrome_executable: if config.chrome_executable.is_empty() {
                None
            } else {
                Some(PathBuf::from(&config.chrome_executable))
            },
        }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze_text", post(routes::analyze_text))
        .route("/analyze_image", post(routes::analyze_image))
        .route("/ocr_image", post(routes::ocr_image))
        .route("/ocr_pdf", post(routes::ocr_pdf))
        .route("/parse_demo", post(routes::parse_demo))
        .route("/history", get(routes::history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
