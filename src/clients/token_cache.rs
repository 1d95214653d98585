//! GigaChat OAuth 访问令牌缓存
//!
//! 令牌惰性刷新：只有下一次使用发现过期才会触发刷新，没有后台定时器。
//! 并发任务可能同时发现过期并各自刷新一次，刷新是幂等的，后写覆盖先写，
//! 任何一个有效令牌都可用

use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GigaChatConfig;
use crate::error::AuthError;

const OAUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
const OAUTH_SCOPE: &str = "GIGACHAT_API_PERS";
const OAUTH_TIMEOUT: Duration = Duration::from_secs(30);
/// 默认令牌有效期（秒），OAuth 响应缺少 expires_in 时使用
const DEFAULT_EXPIRES_IN: u64 = 1800;
/// 安全边际：令牌在名义过期前 30 秒就视为过期
const SAFETY_MARGIN: Duration = Duration::from_secs(30);

/// 访问令牌
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// 令牌是否仍然可用
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// 令牌缓存
///
/// 进程内每个提供方只有一个实例，通过 Arc 在任务间共享
pub struct TokenCache {
    http: reqwest::Client,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// 创建新的令牌缓存
    pub fn new(config: &GigaChatConfig) -> Self {
        Self::with_oauth_url(config, OAUTH_URL)
    }

    /// 使用自定义 OAuth 地址创建（测试用）
    pub fn with_oauth_url(config: &GigaChatConfig, oauth_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            oauth_url: oauth_url.into(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cached: Mutex::new(None),
        }
    }

    /// 获取可用令牌
    ///
    /// 缓存命中且未过期时不发起网络请求，否则同步刷新一次
    pub async fn token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cached.lock().expect("token cache lock").clone() {
            if token.is_valid() {
                debug!("令牌缓存命中");
                return Ok(token);
            }
        }
        self.refresh().await
    }

    /// 刷新令牌
    ///
    /// 有意不在刷新期间持锁：并发刷新是良性竞争（见模块文档）
    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        debug!("刷新 GigaChat 访问令牌");

        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .http
            .post(&self.oauth_url)
            .header("Authorization", format!("Basic {}", basic))
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[("scope", OAUTH_SCOPE)])
            .timeout(OAUTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                warn!("OAuth 请求失败: {}", e);
                AuthError::request_failed(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("OAuth 返回错误状态: {}", status);
            return Err(AuthError::BadStatus {
                status: status.as_u16(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(AuthError::request_failed)?;

        let value = payload
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or(AuthError::MissingToken)?
            .to_string();
        let expires_in = payload
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_EXPIRES_IN);

        let token = AccessToken {
            value,
            expires_at: Instant::now()
                + Duration::from_secs(expires_in).saturating_sub(SAFETY_MARGIN),
        };

        *self.cached.lock().expect("token cache lock") = Some(token.clone());
        debug!("令牌刷新成功，有效期 {} 秒", expires_in);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};

    fn test_config() -> GigaChatConfig {
        GigaChatConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            model: "GigaChat".to_string(),
            configured: true,
        }
    }

    /// 启动只返回固定令牌的 OAuth 模拟服务，返回 (base_url, 请求计数)
    async fn spawn_oauth_mock(expires_in: u64) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let router = Router::new()
            .route(
                "/oauth",
                post(move |State(hits): State<Arc<AtomicUsize>>| async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(serde_json::json!({
                        "access_token": format!("tok-{}", n),
                        "expires_in": expires_in,
                    }))
                }),
            )
            .with_state(hits_clone);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://127.0.0.1:{}/oauth", port), hits)
    }

    #[tokio::test]
    async fn test_valid_token_is_cached() {
        let (url, hits) = spawn_oauth_mock(1800).await;
        let cache = TokenCache::with_oauth_url(&test_config(), url);

        let first = cache.token().await.unwrap();
        let second = cache.token().await.unwrap();

        assert_eq!(first.value, "tok-1");
        assert_eq!(second.value, "tok-1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_triggers_refresh() {
        // expires_in 小于安全边际 ⇒ 令牌立即视为过期
        let (url, hits) = spawn_oauth_mock(1).await;
        let cache = TokenCache::with_oauth_url(&test_config(), url);

        let first = cache.token().await.unwrap();
        let second = cache.token().await.unwrap();

        assert_eq!(first.value, "tok-1");
        assert_eq!(second.value, "tok-2");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_maps_to_auth_error() {
        // 没有监听方的端口 ⇒ 连接失败 ⇒ AuthError
        let cache = TokenCache::with_oauth_url(&test_config(), "http://127.0.0.1:9/oauth");
        let err = cache.token().await.unwrap_err();
        assert!(matches!(err, AuthError::RequestFailed { .. }));
    }
}
