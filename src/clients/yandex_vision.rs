//! Yandex Vision OCR 客户端
//!
//! 单次同步调用：非 2xx 返回 `Ok(None)` 而不是错误，
//! 让调用方能区分「没有可用文本」与硬故障（传输失败）

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::YandexConfig;
use crate::error::UpstreamError;
use crate::utils::logging::truncate_text;

const VISION_URL: &str = "https://vision.api.cloud.yandex.net/vision/v1/batchAnalyze";
const VISION_TIMEOUT: Duration = Duration::from_secs(30);

/// Vision OCR 客户端
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    folder_id: String,
    configured: bool,
}

impl VisionClient {
    /// 创建新的 Vision 客户端
    pub fn new(config: &YandexConfig) -> Self {
        Self::with_endpoint(config, VISION_URL)
    }

    /// 使用自定义端点创建（测试用）
    pub fn with_endpoint(config: &YandexConfig, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: config.api_key.clone(),
            folder_id: config.folder_id.clone(),
            configured: config.configured,
        }
    }

    /// 识别图片中的文字
    pub async fn recognize_image(&self, bytes: &[u8]) -> Result<Option<String>, UpstreamError> {
        debug!("Vision OCR 图片请求，大小: {} 字节", bytes.len());
        self.recognize(bytes, None, false).await
    }

    /// 识别 PDF 中的文字（带分页标记）
    pub async fn recognize_pdf(&self, bytes: &[u8]) -> Result<Option<String>, UpstreamError> {
        debug!("Vision OCR PDF 请求，大小: {} 字节", bytes.len());
        self.recognize(bytes, Some("application/pdf"), true).await
    }

    async fn recognize(
        &self,
        bytes: &[u8],
        mime_type: Option<&str>,
        include_page_headers: bool,
    ) -> Result<Option<String>, UpstreamError> {
        if bytes.is_empty() || !self.configured {
            return Ok(None);
        }

        let payload = build_payload(&self.folder_id, &BASE64.encode(bytes), mime_type);

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&payload)
            .timeout(VISION_TIMEOUT)
            .send()
            .await
            .map_err(|e| UpstreamError::request_failed("vision/batchAnalyze", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Vision OCR 返回错误 {}: {}",
                status,
                truncate_text(&body, 200)
            );
            return Ok(None);
        }

        let data: Value = response
            .json()
            .await
            .map_err(UpstreamError::json_parse_failed)?;

        Ok(parse_text_detection(&data, include_page_headers))
    }
}

/// 构建 batchAnalyze 请求体
fn build_payload(folder_id: &str, content_base64: &str, mime_type: Option<&str>) -> Value {
    let mut spec = json!({
        "content": content_base64,
        "features": [
            {"type": "TEXT_DETECTION", "text_detection_config": {"language_codes": ["*"]}}
        ],
    });
    if let Some(mime) = mime_type {
        spec["mime_type"] = json!(mime);
    }
    json!({"folderId": folder_id, "analyze_specs": [spec]})
}

/// 从 batchAnalyze 响应中提取识别文本
///
/// 逐层遍历 results → results → textDetection → pages → blocks → lines → words，
/// 行内单词用空格连接，每行一个换行，块之间空一行；
/// `include_page_headers` 打开时每页前插入 `--- Page N ---` 标记（PDF 场景）
pub(crate) fn parse_text_detection(data: &Value, include_page_headers: bool) -> Option<String> {
    let mut result_text = String::new();

    let results = data.get("results").and_then(|v| v.as_array())?;
    for result in results {
        let sub_results = match result.get("results").and_then(|v| v.as_array()) {
            Some(items) => items,
            None => continue,
        };
        for sub_res in sub_results {
            let text_detection = match sub_res.get("textDetection") {
                Some(td) => td,
                None => continue,
            };
            let pages = match text_detection.get("pages").and_then(|v| v.as_array()) {
                Some(pages) => pages,
                None => continue,
            };
            for (page_index, page) in pages.iter().enumerate() {
                if include_page_headers {
                    result_text.push_str(&format!("\n--- Page {} ---\n", page_index + 1));
                }
                let blocks = page
                    .get("blocks")
                    .and_then(|v| v.as_array())
                    .map(|b| b.as_slice())
                    .unwrap_or(&[]);
                for block in blocks {
                    let lines = block
                        .get("lines")
                        .and_then(|v| v.as_array())
                        .map(|l| l.as_slice())
                        .unwrap_or(&[]);
                    for line in lines {
                        let words = line
                            .get("words")
                            .and_then(|v| v.as_array())
                            .map(|w| w.as_slice())
                            .unwrap_or(&[]);
                        let line_text = words
                            .iter()
                            .filter_map(|word| word.get("text").and_then(|v| v.as_str()))
                            .collect::<Vec<_>>()
                            .join(" ")
                            .trim()
                            .to_string();
                        if !line_text.is_empty() {
                            result_text.push_str(&line_text);
                            result_text.push('\n');
                        }
                    }
                    result_text.push('\n');
                }
            }
        }
    }

    let result_text = result_text.trim().to_string();
    if result_text.is_empty() {
        None
    } else {
        Some(result_text)
    }
}
