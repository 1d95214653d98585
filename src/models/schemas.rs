//! 内嵌分析服务的请求 / 响应结构
//!
//! 服务端（api 模块）与任务流程（workflow 模块）共用同一套定义

use serde::{Deserialize, Serialize};

use crate::models::analysis::{ImageAnalysis, ImageMetadata, TextAnalysis};
use crate::models::history::HistoryEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub analysis: TextAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseDemoRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseDemoResponse {
    pub title: String,
    pub analysis: TextAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub metadata: ImageMetadata,
    pub analysis: ImageAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryEntry>,
}

/// 错误响应体，形如 `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
