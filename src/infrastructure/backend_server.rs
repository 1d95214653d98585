//! 内嵌分析服务的生命周期管理
//!
//! 职责：
//! 1. **端口分配**：向系统申请一个环回临时端口，分配后不再变化
//! 2. **后台启动**：在独立任务上运行 axum 服务
//! 3. **就绪探测**：轮询 `GET /history` 直到服务可用或预算耗尽
//! 4. **优雅停机**：发送关闭信号并限时等待任务退出，超时则放弃
//!
//! `start()` / `stop()` 都是幂等的。就绪探测失败不算硬错误：
//! 后续任务请求会以连接错误失败，由调度器按普通失败上报

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::api::{self, AppState};
use crate::config::Config;

/// 就绪探测次数上限
const READY_ATTEMPTS: usize = 30;
/// 单次探测的请求超时
const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// 探测间隔
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(100);
/// 停机时等待后台任务退出的上限
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// 服务句柄
///
/// 端口在 `start()` 返回后不可变，可以在任意任务间无锁共享
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle {
    port: u16,
}

impl ServiceHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// 内嵌服务生命周期管理器
pub struct BackendServer {
    config: Config,
    handle: Option<ServiceHandle>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl BackendServer {
    /// 创建管理器（不启动服务）
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handle: None,
            shutdown_tx: None,
            task: None,
        }
    }

    /// 启动内嵌服务并阻塞到就绪探测结束
    ///
    /// 幂等：已在运行时直接返回现有句柄，不会绑定第二个端口
    pub async fn start(&mut self) -> Result<ServiceHandle> {
        if let Some(handle) = self.handle {
            debug!("内嵌服务已在运行: {}", handle.base_url());
            return Ok(handle);
        }

        let state = AppState::from_config(&self.config);
        let router = api::router(state);

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("Не удалось выделить порт для сервиса анализа")?;
        let port = listener
            .local_addr()
            .context("Не удалось определить адрес сервиса анализа")?
            .port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("内嵌服务异常退出: {}", e);
            }
        });

        let handle = ServiceHandle { port };
        self.handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);

        info!("🚀 内嵌分析服务启动中: {}", handle.base_url());
        self.wait_ready(handle).await;

        Ok(handle)
    }

    /// 当前句柄（未启动时为 None）
    pub fn handle(&self) -> Option<ServiceHandle> {
        self.handle
    }

    /// 停止内嵌服务
    ///
    /// 幂等：从未启动或已停止时直接返回
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
                // 超时放弃等待，进程退出时由系统回收
                warn!("⚠️ 内嵌服务未在 {:?} 内退出，放弃等待", SHUTDOWN_TIMEOUT);
            } else {
                info!("✓ 内嵌服务已停止");
            }
        }
        self.handle = None;
    }

    /// 轮询就绪探针
    ///
    /// 预算耗尽也不报错：调用方照常拿到句柄，后续请求自然失败
    async fn wait_ready(&self, handle: ServiceHandle) {
        let client = reqwest::Client::new();
        let url = format!("{}/history", handle.base_url());

        for attempt in 0..READY_ATTEMPTS {
            match client
                .get(&url)
                .timeout(READY_PROBE_TIMEOUT)
                .send()
                .await
            {
                Ok(_) => {
                    debug!("就绪探测成功（第 {} 次尝试）", attempt + 1);
                    info!("✓ 内嵌分析服务已就绪");
                    return;
                }
                Err(_) => sleep(READY_PROBE_INTERVAL).await,
            }
        }

        warn!(
            "⚠️ 内嵌服务在 {} 次探测内未就绪，任务调用将按失败上报",
            READY_ATTEMPTS
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let dir = std::env::temp_dir();
        let mut config = Config::default();
        config.history_path = dir
            .join(format!("history-{}.json", uuid::Uuid::new_v4()))
            .display()
            .to_string();
        config
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let mut server = BackendServer::new(test_config());

        let first = server.start().await.unwrap();
        let second = server.start().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.port(), second.port());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let mut server = BackendServer::new(test_config());
        server.stop().await;
        server.stop().await;
        assert!(server.handle().is_none());
    }

    #[tokio::test]
    async fn test_started_service_answers_readiness_probe() {
        let mut server = BackendServer::new(test_config());
        let handle = server.start().await.unwrap();

        let response = reqwest::get(format!("{}/history", handle.base_url()))
            .await
            .unwrap();
        assert!(response.status().is_success());

        server.stop().await;
    }
}
