//! 基础设施层
//!
//! 持有稀缺资源（内嵌服务的端口与后台任务），只对上层暴露能力

mod backend_server;

pub use backend_server::{BackendServer, ServiceHandle};
