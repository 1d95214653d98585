//! 图片元数据摘要 - 业务能力层
//!
//! 不依赖远程服务：本地解码图片，计算尺寸、宽高比和主色调，
//! 产出喂给图片分析提示词的特征摘要

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::GenericImageView;
use tracing::debug;

use crate::models::analysis::ImageMetadata;

/// 主色调采样边长：缩到 64x64 后求平均
const SAMPLE_SIZE: u32 = 64;

/// 汇总图片元数据
pub fn summarize_image(bytes: &[u8]) -> Result<ImageMetadata> {
    let format = image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .map(|ext| ext.to_uppercase())
        .unwrap_or_else(|| "unknown".to_string());

    let img = image::load_from_memory(bytes).context("Не удалось декодировать изображение")?;
    let (width, height) = img.dimensions();

    let aspect_ratio = if height > 0 {
        (width as f64 / height as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let rgb = img.to_rgb8();
    let resized = image::imageops::resize(&rgb, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle);
    let pixel_count = (resized.width() * resized.height()) as u64;
    let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);
    for pixel in resized.pixels() {
        sum_r += pixel[0] as u64;
        sum_g += pixel[1] as u64;
        sum_b += pixel[2] as u64;
    }
    let dominant_color = format!(
        "#{:02x}{:02x}{:02x}",
        sum_r / pixel_count,
        sum_g / pixel_count,
        sum_b / pixel_count
    );

    debug!(
        "图片摘要: {}x{}, 格式 {}, 主色 {}",
        width, height, format, dominant_color
    );

    Ok(ImageMetadata {
        width: width.to_string(),
        height: height.to_string(),
        aspect_ratio: aspect_ratio.to_string(),
        dominant_color,
        format,
        mode: "RGB".to_string(),
    })
}

/// 把元数据拼成提示词里用的一句话摘要
pub fn metadata_summary(metadata: &ImageMetadata) -> String {
    format!(
        "Формат: {}, размер {}x{}, соотношение {}, доминирующий цвет {}.",
        metadata.format,
        metadata.width,
        metadata.height,
        metadata.aspect_ratio,
        metadata.dominant_color
    )
}
