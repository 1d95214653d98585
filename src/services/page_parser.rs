//! 演示页面抓取 - 业务能力层
//!
//! 用无头浏览器取回渲染后的 HTML，提取标题与可见文本。
//! DOM 级别的抽取策略不在范围内：这里只做脚本剥离和标签清洗

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser;

/// 提取文本的最大长度（按字符计）
const PAGE_TEXT_LIMIT: usize = 4000;

/// 抓取页面并提取 (标题, 可见文本)
pub async fn fetch_page_text(
    url: &str,
    chrome_executable: Option<&Path>,
) -> Result<(String, String)> {
    let (browser, page) = browser::launch_headless_browser(url, chrome_executable)
        .await
        .context("Failed to fetch page with headless browser")?;

    // 等待导航完成再取内容
    let _ = page.wait_for_navigation().await;

    let html = page
        .content()
        .await
        .context("Failed to fetch page with headless browser")?;

    let title = match page.get_title().await {
        Ok(Some(title)) if !title.trim().is_empty() => title.trim().to_string(),
        Ok(_) => "Untitled".to_string(),
        Err(e) => {
            warn!("获取页面标题失败: {}", e);
            "Untitled".to_string()
        }
    };

    // 浏览器用完即弃，Drop 会结束子进程
    drop(browser);

    let text = extract_visible_text(&html);
    info!("✓ 页面抓取完成: {} ({} 字符)", title, text.chars().count());

    Ok((title, text))
}

/// 从 HTML 中提取可见文本
///
/// 剥离 script / style / noscript 与全部标签，解码常见实体，
/// 压缩空白并截断到上限
pub(crate) fn extract_visible_text(html: &str) -> String {
    let mut cleaned = html.to_string();

    for pattern in [
        r"(?is)<script\b.*?</script>",
        r"(?is)<style\b.*?</style>",
        r"(?is)<noscript\b.*?</noscript>",
        r"(?is)<!--.*?-->",
    ] {
        if let Ok(re) = Regex::new(pattern) {
            cleaned = re.replace_all(&cleaned, " ").into_owned();
        }
    }

    if let Ok(re) = Regex::new(r"(?s)<[^>]+>") {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }

    let decoded = cleaned
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let text = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    debug!("提取到 {} 字符的可见文本", text.chars().count());

    text.chars().take(PAGE_TEXT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_strips_scripts_and_tags() {
        let html = r#"
            <html><head>
              <title>Магазин</title>
              <script>var hidden = "secret";</script>
              <style>.a { color: red; }</style>
            </head>
            <body>
              <h1>Лучшие цены</h1>
              <p>Быстрая   доставка&nbsp;по всей стране.</p>
            </body></html>
        "#;
        let text = extract_visible_text(html);

        assert!(text.contains("Лучшие цены"));
        assert!(text.contains("Быстрая доставка по всей стране."));
        assert!(!text.contains("secret"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_extract_decodes_entities() {
        let text = extract_visible_text("<p>Скидки &amp; подарки &lt;сегодня&gt;</p>");
        assert_eq!(text, "Скидки & подарки <сегодня>");
    }

    #[test]
    fn test_extract_truncates_to_limit() {
        let html = format!("<body>{}</body>", "слово ".repeat(2000));
        let text = extract_visible_text(&html);
        assert_eq!(text.chars().count(), PAGE_TEXT_LIMIT);
    }
}
