//! GigaChat 聊天补全客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用（GigaChat 暴露 OpenAI 兼容端点）
//! - Bearer 令牌来自 [`TokenCache`]，每次调用前惰性刷新
//! - 不做重试：降级策略由调用方（services::analysis）决定

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::clients::token_cache::TokenCache;
use crate::config::GigaChatConfig;
use crate::error::{AppError, UpstreamError};

const CHAT_API_BASE: &str = "https://gigachat.devices.sberbank.ru/api/v1";
const CHAT_ENDPOINT: &str = "chat/completions";
const CHAT_TIMEOUT_SECS: u64 = 60;
const CHAT_TEMPERATURE: f32 = 0.2;

/// GigaChat 客户端
pub struct GigaChatClient {
    tokens: Arc<TokenCache>,
    api_base: String,
    model: String,
}

impl GigaChatClient {
    /// 创建新的 GigaChat 客户端
    pub fn new(config: &GigaChatConfig) -> Self {
        Self {
            tokens: Arc::new(TokenCache::new(config)),
            api_base: CHAT_API_BASE.to_string(),
            model: config.model.clone(),
        }
    }

    /// 使用自定义端点创建（测试用）
    pub fn with_endpoints(
        config: &GigaChatConfig,
        api_base: impl Into<String>,
        oauth_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens: Arc::new(TokenCache::with_oauth_url(config, oauth_url)),
            api_base: api_base.into(),
            model: config.model.clone(),
        }
    }

    /// 发送聊天请求
    ///
    /// # 参数
    /// - `prompt`: 用户提示词
    ///
    /// # 返回
    /// 返回模型的响应内容（`choices[0].message.content`，已去除首尾空白）
    pub async fn chat(&self, prompt: &str) -> Result<String, AppError> {
        debug!("调用 GigaChat API，模型: {}", self.model);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let token = self.tokens.token().await?;

        // Bearer 令牌作为 api_key 传入，客户端构造开销可以忽略
        let openai_config = OpenAIConfig::new()
            .with_api_key(&token.value)
            .with_api_base(&self.api_base);
        let client = Client::with_config(openai_config);

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| UpstreamError::request_failed(CHAT_ENDPOINT, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(CHAT_TEMPERATURE)
            .build()
            .map_err(|e| UpstreamError::request_failed(CHAT_ENDPOINT, e))?;

        let response = match tokio::time::timeout(
            Duration::from_secs(CHAT_TIMEOUT_SECS),
            client.chat().create(request),
        )
        .await
        {
            Ok(result) => result.map_err(|e| {
                warn!("GigaChat API 调用失败: {}", e);
                UpstreamError::request_failed(CHAT_ENDPOINT, e)
            })?,
            Err(_) => {
                warn!("GigaChat API 调用超时 ({} 秒)", CHAT_TIMEOUT_SECS);
                return Err(UpstreamError::timeout(CHAT_ENDPOINT, CHAT_TIMEOUT_SECS).into());
            }
        };

        debug!("GigaChat API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| UpstreamError::EmptyResponse {
                endpoint: CHAT_ENDPOINT.to_string(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;

    /// 需要真实凭证，手动运行：cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_gigachat_live_chat() {
        let config = Config::from_env();
        assert!(
            config.gigachat.configured,
            "需要配置 GIGACHAT_CLIENT_ID / GIGACHAT_CLIENT_SECRET"
        );

        let client = GigaChatClient::new(&config.gigachat);
        let response = client
            .chat("Привет! Ответь одним словом: работает?")
            .await
            .unwrap();

        println!("GigaChat 响应: {}", response);
        assert!(!response.is_empty());
    }
}
