// 自定义日志层 - 支持把日志实时转发给订阅方（如界面上的诊断面板）

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use anyhow::{Context as _, Result};
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 日志推送器 - 将日志发送给订阅方
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogMessage>,
    enabled: RwLock<bool>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(512);
        Self {
            sender,
            enabled: RwLock::new(true),
        }
    }

    /// 订阅日志
    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    /// 设置日志推送开关
    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut e) = self.enabled.write() {
            *e = enabled;
        }
    }

    /// 获取日志推送状态
    pub fn is_enabled(&self) -> bool {
        self.enabled.read().map(|e| *e).unwrap_or(false)
    }

    fn emit_log(&self, log: LogMessage) {
        if !self.is_enabled() {
            return;
        }
        // 没有订阅者时丢弃
        let _ = self.sender.send(log);
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// 转发日志的自定义层
pub struct BroadcastLayer {
    broadcaster: Arc<LogBroadcaster>,
}

impl BroadcastLayer {
    pub fn new(broadcaster: Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level().to_string();
        let target = metadata.target().to_string();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                    // 移除首尾引号
                    if self.message.starts_with('"') && self.message.ends_with('"') && self.message.len() >= 2 {
                        self.message = self.message[1..self.message.len() - 1].to_string();
                    }
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        self.broadcaster.emit_log(LogMessage {
            timestamp,
            level,
            target,
            message: visitor.message,
        });
    }
}

/// 默认日志目录
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs/activity-sync")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("activity-sync").join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/activity-sync/logs")
    }
}

/// 解析日志级别，无法识别时回退到 INFO
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// 初始化日志系统（控制台 + 按天轮转的文件 + 推送层）
///
/// 返回的 guard 需要在整个程序生命周期内持有，否则文件日志会丢失
pub fn init_with_broadcaster(
    broadcaster: Arc<LogBroadcaster>,
    level: &str,
    log_dir: Option<PathBuf>,
) -> Result<WorkerGuard> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("创建日志目录失败: {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::daily(log_dir.clone(), "activity-sync.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 同时输出到控制台和文件
    let writer = std::io::stdout.and(non_blocking);

    let timer = LocalTime::new(
        time::format_description::parse(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
        )
        .context("日志时间格式无效")?,
    );

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions)) // release 版本不使用颜色代码
        .finish()
        .with(BroadcastLayer::new(broadcaster));

    tracing::subscriber::set_global_default(subscriber).context("日志系统已初始化")?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(guard)
}
