/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 历史记录文件路径
    pub history_path: String,
    /// 无头浏览器可执行文件路径（为空则自动探测）
    pub chrome_executable: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- GigaChat 配置 ---
    pub gigachat: GigaChatConfig,
    // --- Yandex Cloud 配置 ---
    pub yandex: YandexConfig,
}

/// GigaChat 凭证配置
///
/// `configured` 在加载时显式计算，调用方不做字符串判空
#[derive(Clone, Debug)]
pub struct GigaChatConfig {
    pub client_id: String,
    pub client_secret: String,
    pub model: String,
    pub configured: bool,
}

/// Yandex Cloud 凭证配置（Vision OCR 与 Art 图片生成共用）
#[derive(Clone, Debug)]
pub struct YandexConfig {
    pub api_key: String,
    pub folder_id: String,
    pub art_model_uri: String,
    pub configured: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_path: "history.json".to_string(),
            chrome_executable: String::new(),
            verbose_logging: false,
            gigachat: GigaChatConfig {
                client_id: String::new(),
                client_secret: String::new(),
                model: "GigaChat".to_string(),
                configured: false,
            },
            yandex: YandexConfig {
                api_key: String::new(),
                folder_id: String::new(),
                art_model_uri: String::new(),
                configured: false,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();

        let gigachat_client_id = std::env::var("GIGACHAT_CLIENT_ID").unwrap_or_default();
        let gigachat_client_secret = std::env::var("GIGACHAT_CLIENT_SECRET").unwrap_or_default();
        let yc_api_key = std::env::var("YC_API_KEY").unwrap_or_default();
        let yc_folder_id = std::env::var("YC_FOLDER_ID").unwrap_or_default();
        let yc_art_model_uri = std::env::var("YC_ART_MODEL_URI").unwrap_or_else(|_| {
            if yc_folder_id.is_empty() {
                String::new()
            } else {
                format!("art://{}/yandex-art/latest", yc_folder_id)
            }
        });

        Self {
            history_path: std::env::var("HISTORY_PATH").unwrap_or(default.history_path),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").unwrap_or_default(),
            verbose_logging: std::env::var("VERBOSE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.verbose_logging),
            gigachat: GigaChatConfig {
                configured: !gigachat_client_id.is_empty() && !gigachat_client_secret.is_empty(),
                client_id: gigachat_client_id,
                client_secret: gigachat_client_secret,
                model: std::env::var("GIGACHAT_MODEL").unwrap_or(default.gigachat.model),
            },
            yandex: YandexConfig {
                configured: !yc_api_key.is_empty() && !yc_folder_id.is_empty(),
                api_key: yc_api_key,
                folder_id: yc_folder_id,
                art_model_uri: yc_art_model_uri,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = Config::default();
        assert!(!config.gigachat.configured);
        assert!(!config.yandex.configured);
        assert_eq!(config.gigachat.model, "GigaChat");
        assert_eq!(config.history_path, "history.json");
    }
}
