//! Yandex Art 异步图片生成客户端
//!
//! 提交后轮询 operation 状态，轮询预算固定（30 次 × 2 秒）。
//! 预算耗尽按「无结果」处理，返回 `None` 而不是错误

use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::YandexConfig;
use crate::error::UpstreamError;

const ART_SUBMIT_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/imageGenerationAsync";
const ART_OPERATIONS_URL: &str = "https://llm.api.cloud.yandex.net/operations";
const ART_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: usize = 30;

/// Yandex Art 客户端
pub struct YandexArtClient {
    http: reqwest::Client,
    submit_url: String,
    operations_url: String,
    api_key: String,
    model_uri: String,
    configured: bool,
    poll_interval: Duration,
    max_attempts: usize,
}

impl YandexArtClient {
    /// 创建新的 Art 客户端
    pub fn new(config: &YandexConfig) -> Self {
        Self::with_endpoints(config, ART_SUBMIT_URL, ART_OPERATIONS_URL)
    }

    /// 使用自定义端点创建（测试用）
    pub fn with_endpoints(
        config: &YandexConfig,
        submit_url: impl Into<String>,
        operations_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            submit_url: submit_url.into(),
            operations_url: operations_url.into(),
            api_key: config.api_key.clone(),
            model_uri: config.art_model_uri.clone(),
            configured: config.configured && !config.art_model_uri.is_empty(),
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }

    /// 覆盖轮询策略（测试用）
    pub fn with_poll_policy(mut self, interval: Duration, max_attempts: usize) -> Self {
        self.poll_interval = interval;
        self.max_attempts = max_attempts;
        self
    }

    /// 生成图片
    ///
    /// # 参数
    /// - `prompt`: 生成提示词
    /// - `mime_type`: 期望的图片格式（如 `image/jpeg`）
    ///
    /// # 返回
    /// 成功时返回解码后的图片字节；提供方报错或轮询预算耗尽时返回 `None`
    pub async fn generate(&self, prompt: &str, mime_type: &str) -> Result<Option<Vec<u8>>> {
        if !self.configured {
            return Ok(None);
        }

        let operation_id = match self.submit(prompt, mime_type).await? {
            Some(id) => id,
            None => return Ok(None),
        };

        debug!("图片生成已提交，operation: {}", operation_id);
        self.poll(&operation_id).await
    }

    /// 提交生成请求，返回 operation id
    async fn submit(&self, prompt: &str, mime_type: &str) -> Result<Option<String>> {
        let payload = json!({
            "modelUri": self.model_uri,
            "messages": [{"text": prompt, "weight": 1}],
            "generationOptions": {
                "mimeType": mime_type,
                "seed": chrono::Utc::now().timestamp(),
            },
        });

        let response = self
            .http
            .post(&self.submit_url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&payload)
            .timeout(ART_TIMEOUT)
            .send()
            .await
            .map_err(|e| UpstreamError::request_failed("imageGenerationAsync", e))?;

        if !response.status().is_success() {
            warn!("图片生成提交被拒绝: {}", response.status());
            return Ok(None);
        }

        let data: Value = response
            .json()
            .await
            .map_err(UpstreamError::json_parse_failed)?;

        Ok(data
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    /// 轮询 operation 直到完成或预算耗尽
    async fn poll(&self, operation_id: &str) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/{}", self.operations_url, operation_id);

        for attempt in 0..self.max_attempts {
            sleep(self.poll_interval).await;

            let response = self
                .http
                .get(&url)
                .header("Authorization", format!("Api-Key {}", self.api_key))
                .timeout(ART_TIMEOUT)
                .send()
                .await
                .map_err(|e| UpstreamError::request_failed("operations", e))?;

            let data: Value = response
                .json()
                .await
                .map_err(UpstreamError::json_parse_failed)?;

            if data.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
                if data.get("error").is_some() {
                    warn!("图片生成失败: {:?}", data.get("error"));
                    return Ok(None);
                }
                let image_base64 = data
                    .get("response")
                    .and_then(|r| r.get("image"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let bytes = BASE64
                    .decode(image_base64)
                    .context("Не удалось декодировать изображение из ответа")?;
                debug!("图片生成完成，尝试 {} 次", attempt + 1);
                return Ok(Some(bytes));
            }
        }

        warn!("图片生成超出轮询预算 ({} 次)，按无结果处理", self.max_attempts);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn test_config() -> YandexConfig {
        YandexConfig {
            api_key: "key".to_string(),
            folder_id: "folder".to_string(),
            art_model_uri: "art://folder/yandex-art/latest".to_string(),
            configured: true,
        }
    }

    /// 模拟生成服务：`done_after` 次轮询后返回完成
    async fn spawn_art_mock(done_after: Option<usize>) -> (String, Arc<AtomicUsize>) {
        let polls = Arc::new(AtomicUsize::new(0));
        let polls_clone = polls.clone();

        let router = Router::new()
            .route(
                "/submit",
                post(|| async { Json(serde_json::json!({"id": "op-1"})) }),
            )
            .route(
                "/operations/:id",
                get(move |State(polls): State<Arc<AtomicUsize>>| async move {
                    let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                    match done_after {
                        Some(limit) if n >= limit => Json(serde_json::json!({
                            "done": true,
                            "response": {"image": BASE64.encode(b"png-bytes")},
                        })),
                        _ => Json(serde_json::json!({"done": false})),
                    }
                }),
            )
            .with_state(polls_clone);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let base = format!("http://127.0.0.1:{}", port);
        (base, polls)
    }

    #[tokio::test]
    async fn test_poller_stops_within_attempt_budget() {
        // 模拟服务永远不完成
        let (base, polls) = spawn_art_mock(None).await;
        let client = YandexArtClient::with_endpoints(
            &test_config(),
            format!("{}/submit", base),
            format!("{}/operations", base),
        )
        .with_poll_policy(Duration::from_millis(5), 5);

        let result = client.generate("закат над морем", "image/jpeg").await.unwrap();

        assert!(result.is_none());
        assert_eq!(polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_completed_operation_returns_decoded_bytes() {
        let (base, polls) = spawn_art_mock(Some(2)).await;
        let client = YandexArtClient::with_endpoints(
            &test_config(),
            format!("{}/submit", base),
            format!("{}/operations", base),
        )
        .with_poll_policy(Duration::from_millis(5), 10);

        let result = client.generate("закат над морем", "image/jpeg").await.unwrap();

        assert_eq!(result.unwrap(), b"png-bytes");
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_client_skips_network() {
        let config = YandexConfig {
            api_key: String::new(),
            folder_id: String::new(),
            art_model_uri: String::new(),
            configured: false,
        };
        let client = YandexArtClient::with_endpoints(
            &config,
            "http://127.0.0.1:9/submit",
            "http://127.0.0.1:9/operations",
        );
        let result = client.generate("пейзаж", "image/jpeg").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_yields_none() {
        let router = Router::new()
            .route(
                "/submit",
                post(|| async { Json(serde_json::json!({"id": "op-err"})) }),
            )
            .route(
                "/operations/:id",
                get(|| async {
                    Json(serde_json::json!({
                        "done": true,
                        "error": {"message": "internal"},
                    }))
                }),
            );
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let base = format!("http://127.0.0.1:{}", port);

        let client = YandexArtClient::with_endpoints(
            &test_config(),
            format!("{}/submit", base),
            format!("{}/operations", base),
        )
        .with_poll_policy(Duration::from_millis(5), 3);

        let result = client.generate("пейзаж", "image/jpeg").await.unwrap();
        assert!(result.is_none());
    }
}
