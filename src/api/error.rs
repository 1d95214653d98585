//! 服务端错误 → HTTP 响应映射
//!
//! 错误体统一为 `{"detail": "..."}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::error::{HistoryError, ValidationError};
use crate::models::schemas::ErrorResponse;

/// 内嵌服务的错误类型
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 请求不合法 → 400
    #[error("{0}")]
    BadRequest(String),
    /// 历史存储故障 → 500（内容损坏必须显式报错）
    #[error(transparent)]
    History(#[from] HistoryError),
    /// 其他服务内部故障 → 500
    #[error("{0}")]
    Internal(String),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::History(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}
