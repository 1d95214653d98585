//! 任务调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **离线执行**：每个任务在独立的 tokio 任务上运行，绝不阻塞交互循环
//! 2. **事件投递**：每个任务先投递一次 Running，然后恰好一个终态事件
//!    （Succeeded 或 Failed），不多不少
//! 3. **句柄簿记**：按任务 id 维护运行中任务的句柄表，完成即移除
//!
//! 没有取消机制：任务一旦提交就跑到终态，
//! 交互层通过禁用重复触发来兜住用户

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::infrastructure::ServiceHandle;
use crate::models::job::{Job, JobEvent, JobEventKind, JobId, JobKind, JobStatus};
use crate::workflow::JobFlow;

/// 任务调度器
pub struct JobDispatcher {
    base_url: String,
    events_tx: UnboundedSender<JobEvent>,
    jobs: Arc<Mutex<HashMap<JobId, JoinHandle<()>>>>,
    next_id: AtomicU64,
}

impl JobDispatcher {
    /// 创建新的调度器
    ///
    /// # 参数
    /// - `service`: 内嵌服务句柄（start() 之后端口不变，可安全共享）
    /// - `events_tx`: 事件通道发送端，接收端归交互循环所有
    pub fn new(service: ServiceHandle, events_tx: UnboundedSender<JobEvent>) -> Self {
        Self {
            base_url: service.base_url(),
            events_tx,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// 提交一个任务，立即返回任务 id
    ///
    /// 完成与否通过事件通道异步上报，调用方不等待
    pub fn submit(&self, kind: JobKind) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut job = Job::new(id, kind);
        let flow = JobFlow::new(self.base_url.clone());
        let events_tx = self.events_tx.clone();
        let jobs = self.jobs.clone();

        info!("📤 提交任务 {}", id);

        // 先持有簿记锁再 spawn：任务体内的移除会等插入完成
        let mut guard = self.jobs.lock().expect("job arena lock");
        let task = tokio::spawn(async move {
            job.status = JobStatus::Running;
            let _ = events_tx.send(JobEvent {
                job_id: id,
                kind: JobEventKind::Running,
            });

            let terminal = match flow.run(&job).await {
                Ok(output) => {
                    job.status = JobStatus::Succeeded;
                    info!("✓ 任务 {} 成功", id);
                    JobEventKind::Succeeded(output)
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    error!("❌ 任务 {} 失败: {:#}", id, e);
                    JobEventKind::Failed(format!("{:#}", e))
                }
            };

            // 先移除簿记再投递终态事件：消费方看到终态时句柄一定已回收
            jobs.lock().expect("job arena lock").remove(&id);
            debug!("任务 {} 句柄已回收", id);
            let _ = events_tx.send(JobEvent {
                job_id: id,
                kind: terminal,
            });
        });
        guard.insert(id, task);

        id
    }

    /// 运行中的任务数量
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().expect("job arena lock").len()
    }
}
