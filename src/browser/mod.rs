//! 无头浏览器封装
//!
//! 演示解析功能需要渲染后的页面内容，所以走 CDP 而不是裸 HTTP 请求

mod headless;

pub use headless::launch_headless_browser;
