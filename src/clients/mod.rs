//! 外部服务客户端 - 基础设施层
//!
//! 每个客户端自己负责鉴权、传输与超时策略；
//! 重试与降级由上层（services::analysis）决定

pub mod gigachat;
pub mod token_cache;
pub mod yandex_art;
pub mod yandex_vision;

pub use gigachat::GigaChatClient;
pub use token_cache::{AccessToken, TokenCache};
pub use yandex_art::YandexArtClient;
pub use yandex_vision::VisionClient;
