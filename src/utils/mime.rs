//! 文件扩展名 → MIME 类型映射
//!
//! 上传 multipart 文件时服务端靠 content-type 做校验，
//! 这里只收录桌面端文件选择器允许的格式

use std::path::Path;

use phf::phf_map;

static EXT_MIME: phf::Map<&'static str, &'static str> = phf_map! {
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "webp" => "image/webp",
    "gif" => "image/gif",
    "pdf" => "application/pdf",
};

/// 根据文件路径推断 MIME 类型
pub fn from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    EXT_MIME.get(ext.as_str()).copied()
}
