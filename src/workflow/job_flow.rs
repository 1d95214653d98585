//! 任务处理流程 - 流程层
//!
//! 核心职责：定义一个任务的完整处理流程
//!
//! 流程顺序（综合分析任务）：
//! 1. 输入校验（失败立即结束，不触网）
//! 2. 文本 → 图片 → PDF 子步骤按固定顺序依次调用内嵌服务
//! 3. 任一子步骤失败即中止，已得到的部分结果直接丢弃

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::models::job::{AnalyzeRequest, Job, JobKind, JobOutput};
use crate::models::schemas::{ParseDemoRequest, TextRequest};
use crate::utils::mime;

const TEXT_TIMEOUT: Duration = Duration::from_secs(60);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const PARSE_TIMEOUT: Duration = Duration::from_secs(120);

/// 任务处理流程
///
/// - 编排单个任务的子步骤顺序
/// - 不持有服务资源，只知道服务地址
/// - 不关心事件投递（那是调度器的事）
pub struct JobFlow {
    base_url: String,
    http: reqwest::Client,
}

impl JobFlow {
    /// 创建新的任务流程
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// 执行一个任务，返回任务产出
    pub async fn run(&self, job: &Job) -> Result<JobOutput> {
        match &job.kind {
            JobKind::Analyze(request) => self.run_analyze(job, request).await,
            JobKind::ParseUrl { url } => self.run_parse(job, url).await,
        }
    }

    /// 综合分析：子步骤按 文本 → 图片 → PDF 固定顺序执行
    async fn run_analyze(&self, job: &Job, request: &AnalyzeRequest) -> Result<JobOutput> {
        validate_analyze(request)?;

        let mut output = JobOutput::new();

        if request.selection.text {
            info!("[задача {}] анализ текста...", job.id);
            output.insert("text".to_string(), self.analyze_text(&request.text).await?);
        }
        if request.selection.image {
            let path = request
                .image_path
                .as_deref()
                .ok_or(ValidationError::MissingImage)?;
            info!("[задача {}] анализ изображения...", job.id);
            output.insert("image".to_string(), self.analyze_image(path).await?);
        }
        if request.selection.pdf {
            let path = request
                .pdf_path
                .as_deref()
                .ok_or(ValidationError::MissingPdf)?;
            info!("[задача {}] OCR PDF...", job.id);
            output.insert("pdf".to_string(), self.ocr_pdf(path).await?);
        }

        Ok(output)
    }

    /// URL 解析任务
    async fn run_parse(&self, job: &Job, url: &str) -> Result<JobOutput> {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!(ValidationError::EmptyUrl);
        }

        info!("[задача {}] разбор URL: {}", job.id, url);

        let response = self
            .http
            .post(format!("{}/parse_demo", self.base_url))
            .json(&ParseDemoRequest {
                url: url.to_string(),
            })
            .timeout(PARSE_TIMEOUT)
            .send()
            .await
            .context("Ошибка парсинга")?;
        let data = unwrap_response(response, "Ошибка парсинга").await?;

        let mut output = JobOutput::new();
        output.insert("parse_demo".to_string(), data);
        Ok(output)
    }

    // ========== 子步骤 ==========

    async fn analyze_text(&self, text: &str) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/analyze_text", self.base_url))
            .json(&TextRequest {
                text: text.to_string(),
            })
            .timeout(TEXT_TIMEOUT)
            .send()
            .await
            .context("Ошибка анализа текста")?;
        unwrap_response(response, "Ошибка анализа текста").await
    }

    async fn analyze_image(&self, path: &Path) -> Result<Value> {
        let response = self
            .upload(path, "/analyze_image")
            .await
            .context("Ошибка анализа изображения")?;
        unwrap_response(response, "Ошибка анализа изображения").await
    }

    async fn ocr_pdf(&self, path: &Path) -> Result<Value> {
        let response = self
            .upload(path, "/ocr_pdf")
            .await
            .context("Ошибка OCR PDF")?;
        unwrap_response(response, "Ошибка OCR PDF").await
    }

    /// 上传文件到指定端点
    async fn upload(&self, path: &Path, endpoint: &str) -> Result<reqwest::Response> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Не удалось прочитать файл {}", path.display()))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        debug!("上传 {} ({} 字节) 到 {}", filename, bytes.len(), endpoint);

        let mut part = Part::bytes(bytes).file_name(filename);
        if let Some(mime_type) = mime::from_path(path) {
            part = part.mime_str(mime_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}{}", self.base_url, endpoint))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;
        Ok(response)
    }
}

/// 解包服务响应
///
/// 与桌面端一致：先解析 JSON，再看状态码；
/// 失败时优先取响应里的 detail 作为用户可见消息
async fn unwrap_response(response: reqwest::Response, default_msg: &str) -> Result<Value> {
    let status = response.status();
    let data: Value = response
        .json()
        .await
        .with_context(|| default_msg.to_string())?;

    if !status.is_success() {
        let detail = data
            .get("detail")
            .and_then(|v| v.as_str())
            .unwrap_or(default_msg);
        anyhow::bail!("{}", detail);
    }

    Ok(data)
}

/// 校验综合分析请求
fn validate_analyze(request: &AnalyzeRequest) -> Result<(), ValidationError> {
    if request.selection.is_empty() {
        return Err(ValidationError::EmptySelection);
    }
    if request.selection.text && request.text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if request.selection.image && request.image_path.is_none() {
        return Err(ValidationError::MissingImage);
    }
    if request.selection.pdf && request.pdf_path.is_none() {
        return Err(ValidationError::MissingPdf);
    }
    Ok(())
}
