//! 分析结果模型
//!
//! 所有字段都带 `#[serde(default)]`，保证无论上游返回什么，
//! 反序列化出的结果始终包含全部预期键

use serde::{Deserialize, Serialize};

/// 文本分析结果（四个分类列表 + 原始透传）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub unique_offers: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// 上游输出无法解析为结构化数据时的原始文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl TextAnalysis {
    /// 是否没有任何有意义的内容（全部分类为空）
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.unique_offers.is_empty()
            && self.recommendations.is_empty()
    }
}

/// 图片分析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub style_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ImageAnalysis {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty() && self.insights.is_empty() && self.style_score.is_none()
    }
}

/// 图片元数据摘要
///
/// 字段全部为字符串，与服务的历史 JSON 格式保持一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: String,
    pub height: String,
    pub aspect_ratio: String,
    pub dominant_color: String,
    pub format: String,
    pub mode: String,
}
