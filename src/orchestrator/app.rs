//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：启动日志、拉起内嵌分析服务并等待就绪
//! 2. **交互循环**：读取控制台命令，提交任务，消费任务事件
//! 3. **触发防抖**：同类触发在终态事件返回前禁止重复提交
//! 4. **资源管理**：退出时优雅停掉内嵌服务
//!
//! 展示层（GUI）不在范围内，控制台只做最简单的输入输出

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{BackendServer, ServiceHandle};
use crate::models::job::{
    AnalyzeRequest, AnalyzeSelection, JobEvent, JobEventKind, JobId, JobKind,
};
use crate::orchestrator::JobDispatcher;
use crate::utils::logging::truncate_text;

/// 应用主结构
pub struct App {
    config: Config,
    backend: BackendServer,
    service: ServiceHandle,
    /// 运行中的分析任务（同类触发防抖）
    analyze_job: Option<JobId>,
    /// 运行中的解析任务
    parse_job: Option<JobId>,
}

impl App {
    /// 初始化应用：启动内嵌服务并等待就绪
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let mut backend = BackendServer::new(config.clone());
        let service = backend.start().await?;

        Ok(Self {
            config,
            backend,
            service,
            analyze_job: None,
            parse_job: None,
        })
    }

    /// 运行交互循环
    pub async fn run(mut self) -> Result<()> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let dispatcher = JobDispatcher::new(self.service, events_tx);

        print_usage();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(command) => {
                            if !self.handle_command(&dispatcher, command.trim()) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                Some(event) = events_rx.recv() => self.handle_event(event),
            }
        }

        info!("Завершение работы...");
        self.backend.stop().await;
        Ok(())
    }

    /// 处理一条控制台命令，返回 false 表示退出
    fn handle_command(&mut self, dispatcher: &JobDispatcher, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match command {
            "exit" | "quit" => return false,
            "text" => self.submit_analyze(
                dispatcher,
                AnalyzeRequest {
                    selection: AnalyzeSelection {
                        text: true,
                        ..Default::default()
                    },
                    text: rest.to_string(),
                    ..Default::default()
                },
            ),
            "image" => self.submit_analyze(
                dispatcher,
                AnalyzeRequest {
                    selection: AnalyzeSelection {
                        image: true,
                        ..Default::default()
                    },
                    image_path: path_arg(rest),
                    ..Default::default()
                },
            ),
            "pdf" => self.submit_analyze(
                dispatcher,
                AnalyzeRequest {
                    selection: AnalyzeSelection {
                        pdf: true,
                        ..Default::default()
                    },
                    pdf_path: path_arg(rest),
                    ..Default::default()
                },
            ),
            "full" => {
                // full <изображение> <pdf> <текст...>
                let mut parts = rest.splitn(3, char::is_whitespace);
                let image = parts.next().unwrap_or("");
                let pdf = parts.next().unwrap_or("");
                let text = parts.next().unwrap_or("");
                self.submit_analyze(
                    dispatcher,
                    AnalyzeRequest {
                        selection: AnalyzeSelection {
                            text: true,
                            image: true,
                            pdf: true,
                        },
                        text: text.to_string(),
                        image_path: path_arg(image),
                        pdf_path: path_arg(pdf),
                    },
                )
            }
            "url" => self.submit_parse(dispatcher, rest),
            _ => {
                warn!("Неизвестная команда: {}", command);
                print_usage();
            }
        }
        true
    }

    /// 提交综合分析任务（同类触发防抖）
    fn submit_analyze(&mut self, dispatcher: &JobDispatcher, request: AnalyzeRequest) {
        if self.analyze_job.is_some() {
            warn!("Дождитесь завершения текущего анализа.");
            return;
        }
        info!("Выполняю анализ...");
        let id = dispatcher.submit(JobKind::Analyze(request));
        self.analyze_job = Some(id);
    }

    /// 提交 URL 解析任务
    fn submit_parse(&mut self, dispatcher: &JobDispatcher, url: &str) {
        if self.parse_job.is_some() {
            warn!("Дождитесь завершения текущего разбора URL.");
            return;
        }
        info!("Собираю данные...");
        let id = dispatcher.submit(JobKind::ParseUrl {
            url: url.to_string(),
        });
        self.parse_job = Some(id);
    }

    /// 消费任务事件（交互循环内，顺序与投递一致）
    fn handle_event(&mut self, event: JobEvent) {
        match event.kind {
            JobEventKind::Running => {
                info!("[задача {}] выполняется...", event.job_id);
            }
            JobEventKind::Succeeded(output) => {
                self.clear_trigger(event.job_id);
                info!("[задача {}] готово", event.job_id);
                for (section, value) in &output {
                    let rendered = if self.config.verbose_logging {
                        serde_json::to_string_pretty(value).unwrap_or_default()
                    } else {
                        truncate_text(&value.to_string(), 400)
                    };
                    info!("  {}: {}", section, rendered);
                }
            }
            JobEventKind::Failed(message) => {
                self.clear_trigger(event.job_id);
                warn!("Ошибка: {}", message);
            }
        }
    }

    /// 终态事件到达后解除对应触发的防抖
    fn clear_trigger(&mut self, job_id: JobId) {
        if self.analyze_job == Some(job_id) {
            self.analyze_job = None;
        }
        if self.parse_job == Some(job_id) {
            self.parse_job = None;
        }
    }
}

fn path_arg(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Ассистент «Мониторинг конкурентов»");
    info!(
        "📊 GigaChat: {} | Yandex Vision: {}",
        if config.gigachat.configured {
            "настроен"
        } else {
            "эвристический режим"
        },
        if config.yandex.configured {
            "настроен"
        } else {
            "выключен"
        }
    );
    info!("{}", "=".repeat(60));
}

fn print_usage() {
    info!("Команды:");
    info!("  text <текст>                        — анализ текста конкурента");
    info!("  image <путь>                        — анализ изображения");
    info!("  pdf <путь>                          — OCR PDF");
    info!("  full <изображение> <pdf> <текст>    — все три анализа разом");
    info!("  url <адрес>                         — демо-парсинг страницы");
    info!("  exit                                — выход");
}
