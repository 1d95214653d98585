use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 输入校验错误（立即反馈给用户，不重试）
    Validation(ValidationError),
    /// 凭证刷新错误（分析路径回退到启发式结果）
    Auth(AuthError),
    /// 上游服务错误（超时 / 非 2xx / 传输失败）
    Upstream(UpstreamError),
    /// 历史记录存储错误
    History(HistoryError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Upstream(e) => write!(f, "{}", e),
            AppError::History(e) => write!(f, "{}", e),
            AppError::Other(msg) => write!(f, "Ошибка: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Validation(e) => Some(e),
            AppError::Auth(e) => Some(e),
            AppError::Upstream(e) => Some(e),
            AppError::History(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 输入校验错误
///
/// 用户可见文案沿用桌面端的俄语提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 没有选择任何分析类型
    EmptySelection,
    /// 分析文本为空
    EmptyText,
    /// 未选择图片文件
    MissingImage,
    /// 未选择 PDF 文件
    MissingPdf,
    /// URL 为空
    EmptyUrl,
    /// URL 格式不正确
    InvalidUrl,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptySelection => {
                write!(f, "Выберите хотя бы один тип анализа.")
            }
            ValidationError::EmptyText => write!(f, "Введите текст для анализа."),
            ValidationError::MissingImage => write!(f, "Не выбрано изображение"),
            ValidationError::MissingPdf => write!(f, "Не выбран PDF"),
            ValidationError::EmptyUrl => write!(f, "Введите URL."),
            ValidationError::InvalidUrl => {
                write!(f, "Неверный формат URL. Пример: https://example.com")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// 凭证刷新错误
#[derive(Debug)]
pub enum AuthError {
    /// 请求 OAuth 服务失败
    RequestFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// OAuth 服务返回错误状态
    BadStatus { status: u16 },
    /// 响应中缺少 access_token
    MissingToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::RequestFailed { source } => {
                write!(f, "Не удалось запросить токен доступа: {}", source)
            }
            AuthError::BadStatus { status } => {
                write!(f, "Сервис авторизации вернул статус {}", status)
            }
            AuthError::MissingToken => {
                write!(f, "Ответ авторизации не содержит access_token")
            }
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::RequestFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 上游服务错误
#[derive(Debug)]
pub enum UpstreamError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 请求超时
    Timeout { endpoint: String, seconds: u64 },
    /// 返回结果为空
    EmptyResponse { endpoint: String },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::RequestFailed { endpoint, source } => {
                write!(f, "Ошибка запроса к {}: {}", endpoint, source)
            }
            UpstreamError::Timeout { endpoint, seconds } => {
                write!(f, "Превышено время ожидания ({} с) для {}", seconds, endpoint)
            }
            UpstreamError::EmptyResponse { endpoint } => {
                write!(f, "Пустой ответ от {}", endpoint)
            }
            UpstreamError::JsonParseFailed { source } => {
                write!(f, "Не удалось разобрать ответ сервиса: {}", source)
            }
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstreamError::RequestFailed { source, .. }
            | UpstreamError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 历史记录存储错误
#[derive(Debug)]
pub enum HistoryError {
    /// 历史文件内容无法解析（视为硬错误，不能悄悄丢弃历史）
    Corrupted { path: String },
    /// 读取历史文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入历史文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Corrupted { path } => {
                write!(f, "History file is corrupted: {}", path)
            }
            HistoryError::ReadFailed { path, source } => {
                write!(f, "Не удалось прочитать историю ({}): {}", path, source)
            }
            HistoryError::WriteFailed { path, source } => {
                write!(f, "Не удалось сохранить историю ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::ReadFailed { source, .. } | HistoryError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从子错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream(err)
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        AppError::History(err)
    }
}

// ========== 便捷构造函数 ==========

impl AuthError {
    /// 创建 OAuth 请求失败错误
    pub fn request_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AuthError::RequestFailed {
            source: Box::new(source),
        }
    }
}

impl UpstreamError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        UpstreamError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// 创建超时错误
    pub fn timeout(endpoint: impl Into<String>, seconds: u64) -> Self {
        UpstreamError::Timeout {
            endpoint: endpoint.into(),
            seconds,
        }
    }

    /// 创建 JSON 解析失败错误
    pub fn json_parse_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        UpstreamError::JsonParseFailed {
            source: Box::new(source),
        }
    }
}

impl HistoryError {
    /// 创建读取失败错误
    pub fn read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HistoryError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// 创建写入失败错误
    pub fn write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HistoryError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::EmptySelection.to_string(),
            "Выберите хотя бы один тип анализа."
        );
        assert_eq!(
            ValidationError::InvalidUrl.to_string(),
            "Неверный формат URL. Пример: https://example.com"
        );
    }

    #[test]
    fn test_app_error_wraps_subtypes() {
        let err = AppError::from(ValidationError::EmptyText);
        assert_eq!(err.to_string(), "Введите текст для анализа.");

        let err = AppError::from(AuthError::MissingToken);
        assert!(err.to_string().contains("access_token"));
    }
}
