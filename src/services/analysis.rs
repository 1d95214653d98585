//! 分析编排服务 - 业务能力层
//!
//! 对每种分析类型执行降级链：
//! 远程调用 → 结构化解析 → 启发式兜底。
//! `analyze_text` / `analyze_image` 是全函数，永远返回包含全部预期键的结果

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::clients::GigaChatClient;
use crate::config::GigaChatConfig;
use crate::models::analysis::{ImageAnalysis, TextAnalysis};

/// 分析编排服务
///
/// 职责：
/// - 按类型构建提示词并调用 GigaChat
/// - 解析结构化输出，失败时兜底
/// - 未配置凭证时直接走启发式路径，不发起网络请求
pub struct AnalysisOrchestrator {
    chat: GigaChatClient,
    configured: bool,
}

impl AnalysisOrchestrator {
    /// 创建新的分析编排服务
    pub fn new(config: &GigaChatConfig) -> Self {
        Self {
            chat: GigaChatClient::new(config),
            configured: config.configured,
        }
    }

    /// 分析竞品文本
    pub async fn analyze_text(&self, text: &str) -> TextAnalysis {
        if !self.configured {
            debug!("GigaChat 未配置，直接走启发式分析");
            return fallback_text_analysis(text, None);
        }

        let prompt = build_text_prompt(text);
        match self.chat.chat(&prompt).await {
            Ok(response) => match extract_json::<TextAnalysis>(&response) {
                Some(parsed) if !parsed.is_empty() => parsed,
                _ => {
                    debug!("响应无法解析为结构化分析，保留原文并兜底");
                    fallback_text_analysis(text, Some(response))
                }
            },
            Err(e) => {
                warn!("文本分析调用失败，走启发式兜底: {}", e);
                fallback_text_analysis(text, None)
            }
        }
    }

    /// 基于图片描述做分析
    ///
    /// # 参数
    /// - `summary`: 预先计算好的图片特征摘要（见 image_meta 模块）
    pub async fn analyze_image(&self, summary: &str) -> ImageAnalysis {
        if !self.configured {
            debug!("GigaChat 未配置，直接走启发式分析");
            return fallback_image_analysis(summary, None);
        }

        let prompt = build_image_prompt(summary);
        match self.chat.chat(&prompt).await {
            Ok(response) => match extract_json::<ImageAnalysis>(&response) {
                Some(parsed) if !parsed.is_empty() => parsed,
                _ => {
                    debug!("响应无法解析为结构化分析，保留原文并兜底");
                    fallback_image_analysis(summary, Some(response))
                }
            },
            Err(e) => {
                warn!("图片分析调用失败，走启发式兜底: {}", e);
                fallback_image_analysis(summary, None)
            }
        }
    }
}

/// 构建文本分析提示词
fn build_text_prompt(text: &str) -> String {
    format!(
        "Ты маркетинговый аналитик. \
         Сделай структурированный анализ конкурентного текста. \
         Верни ответ строго в JSON с ключами: \
         strengths, weaknesses, unique_offers, recommendations. \
         Каждое поле — список строк. \
         \n\nТекст конкурента:\n{}",
        text
    )
}

/// 构建图片分析提示词
fn build_image_prompt(summary: &str) -> String {
    format!(
        "Ты маркетинговый аналитик. \
         На основе описания изображения дай анализ. \
         Верни ответ строго в JSON с ключами: \
         description, insights, style_score. \
         description — строка, insights — список строк, \
         style_score — число от 1 до 10.\n\n\
         Описание: {}",
        summary
    )
}

/// 从模型响应中提取 JSON
///
/// 先尝试整体解析；失败则取第一个 `{` 到最后一个 `}` 的片段重试
fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(parsed) = serde_json::from_str::<T>(text) {
        return Some(parsed);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&text[start..=end]).ok()
}

/// 文本分析启发式兜底
///
/// 基于输入第一行合成确定性的结果；`raw` 保留无法解析的模型原文以便审计
fn fallback_text_analysis(text: &str, raw: Option<String>) -> TextAnalysis {
    let snippet: String = text
        .trim()
        .split('\n')
        .next()
        .unwrap_or("")
        .chars()
        .take(120)
        .collect();

    TextAnalysis {
        strengths: vec![format!(
            "Четко сформулирован основной месседж: {}",
            snippet
        )],
        weaknesses: vec!["Недостаточно данных о подтверждениях и кейсах.".to_string()],
        unique_offers: vec![
            "Упоминание пользы для клиента нуждается в уточнении.".to_string(),
        ],
        recommendations: vec![
            "Добавить конкретные выгоды и цифры.".to_string(),
            "Усилить призыв к действию.".to_string(),
        ],
        raw,
    }
}

/// 图片分析启发式兜底
fn fallback_image_analysis(summary: &str, raw: Option<String>) -> ImageAnalysis {
    ImageAnalysis {
        description: format!("Изображение с характеристиками: {}.", summary),
        insights: vec![
            "Проверьте, соответствует ли визуальный стиль бренду.".to_string(),
        ],
        style_score: Some(6.0),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::post;
    use axum::{Json, Router};

    /// 启动一个假的 GigaChat 服务：OAuth 永远成功，
    /// chat/completions 返回给定的文本内容
    async fn spawn_gigachat_mock(content: &str) -> String {
        let content = content.to_string();
        let router = Router::new()
            .route(
                "/oauth",
                post(|| async {
                    Json(serde_json::json!({"access_token": "tok", "expires_in": 1800}))
                }),
            )
            .route(
                "/chat/completions",
                post(move || async move {
                    Json(serde_json::json!({
                        "id": "chatcmpl-1",
                        "object": "chat.completion",
                        "created": 1,
                        "model": "GigaChat",
                        "choices": [{
                            "index": 0,
                            "message": {"role": "assistant", "content": content},
                            "finish_reason": "stop",
                            "logprobs": null,
                        }],
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
        format!("http://127.0.0.1:{}", port)
    }

    fn configured_orchestrator(base: &str) -> AnalysisOrchestrator {
        let config = GigaChatConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            model: "GigaChat".to_string(),
            configured: true,
        };
        AnalysisOrchestrator {
            chat: crate::clients::GigaChatClient::with_endpoints(
                &config,
                base.to_string(),
                format!("{}/oauth", base),
            ),
            configured: true,
        }
    }

    #[tokio::test]
    async fn test_structured_response_is_parsed() {
        let base = spawn_gigachat_mock(
            "Вот анализ: {\"strengths\": [\"s1\"], \"weaknesses\": [\"w1\"], \
             \"unique_offers\": [\"u1\"], \"recommendations\": [\"r1\"]}",
        )
        .await;
        let orchestrator = configured_orchestrator(&base);

        let analysis = orchestrator.analyze_text("Отличные цены").await;

        assert_eq!(analysis.strengths, vec!["s1"]);
        assert_eq!(analysis.recommendations, vec!["r1"]);
        assert!(analysis.raw.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back_and_keeps_raw() {
        let base = spawn_gigachat_mock("просто рассуждения без какой-либо разметки").await;
        let orchestrator = configured_orchestrator(&base);

        let analysis = orchestrator.analyze_text("Отличные цены").await;

        // 启发式结果 + 原始文本透传
        assert_eq!(
            analysis.strengths,
            vec!["Четко сформулирован основной месседж: Отличные цены"]
        );
        assert_eq!(
            analysis.raw.as_deref(),
            Some("просто рассуждения без какой-либо разметки")
        );
    }

    #[tokio::test]
    async fn test_auth_failure_falls_back_without_raw() {
        // OAuth 返回 500：凭证刷新失败被降级链吸收，不会向用户抛错
        let router = Router::new().route(
            "/oauth",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "boom"})),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let orchestrator = configured_orchestrator(&format!("http://127.0.0.1:{}", port));
        let analysis = orchestrator.analyze_text("Отличные цены").await;

        assert_eq!(
            analysis.strengths,
            vec!["Четко сформулирован основной месседж: Отличные цены"]
        );
        assert!(analysis.raw.is_none());
    }

    #[test]
    fn test_extract_json_direct() {
        let parsed: TextAnalysis =
            extract_json(r#"{"strengths": ["s1"], "weaknesses": ["w1"]}"#).unwrap();
        assert_eq!(parsed.strengths, vec!["s1"]);
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let text = "Вот анализ:\n```json\n{\"strengths\": [\"s1\"]}\n``` Удачи!";
        let parsed: TextAnalysis = extract_json(text).unwrap();
        assert_eq!(parsed.strengths, vec!["s1"]);
    }

    #[test]
    fn test_extract_json_no_json_substring() {
        let parsed: Option<TextAnalysis> = extract_json("никакого json здесь нет");
        assert!(parsed.is_none());
    }

    #[test]
    fn test_fallback_uses_first_line_snippet() {
        let analysis = fallback_text_analysis("Great prices, fast shipping.", None);
        assert_eq!(
            analysis.strengths,
            vec!["Четко сформулирован основной месседж: Great prices, fast shipping."]
        );
        assert!(!analysis.recommendations.is_empty());
        assert!(analysis.raw.is_none());
    }

    #[test]
    fn test_fallback_truncates_long_first_line() {
        let long_line = "а".repeat(200);
        let analysis = fallback_text_analysis(&long_line, None);
        let snippet_len = analysis.strengths[0]
            .strip_prefix("Четко сформулирован основной месседж: ")
            .unwrap()
            .chars()
            .count();
        assert_eq!(snippet_len, 120);
    }

    #[tokio::test]
    async fn test_unconfigured_text_analysis_is_heuristic() {
        let config = GigaChatConfig {
            client_id: String::new(),
            client_secret: String::new(),
            model: "GigaChat".to_string(),
            configured: false,
        };
        let orchestrator = AnalysisOrchestrator::new(&config);

        let analysis = orchestrator
            .analyze_text("Great prices, fast shipping.")
            .await;

        assert_eq!(
            analysis.strengths,
            vec!["Четко сформулирован основной месседж: Great prices, fast shipping."]
        );
        assert!(!analysis.weaknesses.is_empty());
        assert!(!analysis.unique_offers.is_empty());
        assert!(!analysis.recommendations.is_empty());
    }

    #[test]
    fn test_unconfigured_image_analysis_is_heuristic() {
        let config = GigaChatConfig {
            client_id: String::new(),
            client_secret: String::new(),
            model: "GigaChat".to_string(),
            configured: false,
        };
        let orchestrator = AnalysisOrchestrator::new(&config);

        // 无凭证路径不触网，同步跑完即可
        let analysis =
            tokio_test::block_on(orchestrator.analyze_image("Формат: PNG, размер 64x64"));

        assert!(analysis.description.contains("Формат: PNG"));
        assert_eq!(analysis.style_score, Some(6.0));
        assert!(!analysis.insights.is_empty());
    }
}
