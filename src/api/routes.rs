//! 内嵌分析服务的请求处理器

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::api::{AppState, ServiceError};
use crate::error::ValidationError;
use crate::models::schemas::{
    HistoryResponse, ImageResponse, OcrResponse, ParseDemoRequest, ParseDemoResponse, TextRequest,
    TextResponse,
};
use crate::services::image_meta::{metadata_summary, summarize_image};
use crate::services::page_parser::fetch_page_text;
use crate::utils::logging::truncate_chars;

/// POST /analyze_text
pub async fn analyze_text(
    State(state): State<AppState>,
    Json(payload): Json<TextRequest>,
) -> Result<Json<TextResponse>, ServiceError> {
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(ServiceError::BadRequest("Text is required".to_string()));
    }

    let analysis = state.analysis.analyze_text(&text).await;
    state.history.save(
        "text",
        json!({"text": truncate_chars(&text, 500)}),
        json!(analysis),
    )?;

    Ok(Json(TextResponse { analysis }))
}

/// POST /analyze_image
pub async fn analyze_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageResponse>, ServiceError> {
    let upload = read_upload(&mut multipart).await?;
    require_image(&upload)?;

    let metadata = summarize_image(&upload.bytes)
        .map_err(|_| ServiceError::BadRequest("Image file is required".to_string()))?;
    let summary = metadata_summary(&metadata);
    debug!("图片摘要: {}", summary);

    let analysis = state.analysis.analyze_image(&summary).await;
    state.history.save(
        "image",
        json!({"filename": upload.filename, "content_type": upload.content_type}),
        json!({"metadata": metadata, "analysis": analysis}),
    )?;

    Ok(Json(ImageResponse { metadata, analysis }))
}

/// POST /ocr_image
pub async fn ocr_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, ServiceError> {
    let upload = read_upload(&mut multipart).await?;
    require_image(&upload)?;

    let text = state
        .vision
        .recognize_image(&upload.bytes)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .ok_or_else(|| ServiceError::BadRequest("OCR failed".to_string()))?;

    state.history.save(
        "ocr_image",
        json!({"filename": upload.filename, "content_type": upload.content_type}),
        ocr_output(&text),
    )?;

    Ok(Json(OcrResponse { text }))
}

/// POST /ocr_pdf
pub async fn ocr_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, ServiceError> {
    let upload = read_upload(&mut multipart).await?;

    let is_pdf = upload.content_type.as_deref() == Some("application/pdf")
        || upload
            .filename
            .as_deref()
            .map(|name| name.to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
    if !is_pdf {
        return Err(ServiceError::BadRequest("PDF file is required".to_string()));
    }
    if upload.bytes.is_empty() {
        return Err(ServiceError::BadRequest("Empty file".to_string()));
    }

    let text = state
        .vision
        .recognize_pdf(&upload.bytes)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .ok_or_else(|| ServiceError::BadRequest("OCR failed".to_string()))?;

    state.history.save(
        "ocr_pdf",
        json!({"filename": upload.filename, "content_type": upload.content_type}),
        ocr_output(&text),
    )?;

    Ok(Json(OcrResponse { text }))
}

/// POST /parse_demo
pub async fn parse_demo(
    State(state): State<AppState>,
    Json(payload): Json<ParseDemoRequest>,
) -> Result<Json<ParseDemoResponse>, ServiceError> {
    let normalized_url =
        normalize_url(&payload.url).ok_or(ValidationError::InvalidUrl)?;

    let (title, text) = fetch_page_text(&normalized_url, state.chrome_executable.as_deref())
        .await
        .map_err(|e| {
            warn!("页面抓取失败: {:#}", e);
            ServiceError::Internal(format!("{:#}", e))
        })?;
    if text.is_empty() {
        return Err(ServiceError::BadRequest("Empty page content".to_string()));
    }

    let analysis = state.analysis.analyze_text(&text).await;
    state
        .history
        .save("parse_demo", json!({"url": normalized_url}), json!(analysis))?;

    Ok(Json(ParseDemoResponse { title, analysis }))
}

/// GET /history（同时兼作就绪探针）
pub async fn history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, ServiceError> {
    let items = state.history.entries()?;
    Ok(Json(HistoryResponse { items }))
}

// ========== 辅助函数 ==========

/// 一次 multipart 上传
struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// 读取名为 `file` 的 multipart 字段
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("Некорректная загрузка файла: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("Некорректная загрузка файла: {}", e)))?
            .to_vec();
        return Ok(Upload {
            filename,
            content_type,
            bytes,
        });
    }
    Err(ServiceError::BadRequest("Файл не передан".to_string()))
}

/// 校验上传内容是图片且非空
fn require_image(upload: &Upload) -> Result<(), ServiceError> {
    let is_image = upload
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(ServiceError::BadRequest("Image file is required".to_string()));
    }
    if upload.bytes.is_empty() {
        return Err(ServiceError::BadRequest("Empty file".to_string()));
    }
    Ok(())
}

/// OCR 结果的历史记录摘要（截断到 2000 字符）
fn ocr_output(text: &str) -> serde_json::Value {
    json!({
        "text": truncate_chars(text, 2000),
        "truncated": text.chars().count() > 2000,
    })
}

/// 规范化用户输入的 URL
///
/// 缺少协议时补 https://，只接受带主机名的 http/https 地址
fn normalize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(candidate)
}
