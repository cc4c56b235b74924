//! 应用程序初始化和启动
//!
//! 负责客户端的完整启动流程，包括：
//! - 配置加载
//! - 日志系统初始化
//! - 仓库与 Actor 初始化
//! - 首次加载活动并输出按日期分组的面板
//! - 退出前汇总本次运行的警告和错误日志

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};

use crate::event_bus::StoreEvent;
use crate::logger::{self, LogBroadcaster, LogMessage};
use crate::settings::SettingsManager;
use crate::store::ActivityStore;
use crate::AppState;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "ACTIVITY_SYNC_CONFIG";

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("activity-sync")
        .join("settings.json")
}

/// 应用程序入口点
///
/// 1. 加载配置
/// 2. 日志系统初始化
/// 3. 构建仓库和当前用户 Actor
/// 4. 加载活动列表并输出面板
/// 5. 汇总本次运行的警告和错误
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(default_config_path);
    let settings = Arc::new(SettingsManager::new(config_path.clone()).await?);
    let config = settings.get().await;

    let log_dir = config
        .log_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(logger::default_log_dir);
    let log_broadcaster = Arc::new(LogBroadcaster::new());
    let _log_guard = logger::init_with_broadcaster(
        log_broadcaster.clone(),
        &config.log_level,
        Some(log_dir.clone()),
    )?;

    info!("初始化活动客户端，配置文件: {:?}", config_path);

    let state = AppState::initialize(settings, log_broadcaster).await?;

    let mut diagnostics = state.log_broadcaster.subscribe();
    let listener = tokio::spawn(watch_events(state.event_bus.subscribe()));

    let count = state.store.load_all().await;
    if count == 0 && state.store.is_empty() {
        warn!("没有可显示的活动");
    }

    print!("{}", render_dashboard(&state.store));

    listener.abort();
    let problems = count_problems(&mut diagnostics);
    if problems > 0 {
        eprintln!(
            "[!] {} warning(s)/error(s) logged during this run, see {:?}",
            problems, log_dir
        );
    }
    info!("活动客户端已退出");
    Ok(())
}

/// 输出用户提示和跳转事件
async fn watch_events(mut receiver: Receiver<StoreEvent>) {
    loop {
        match receiver.recv().await {
            Ok(StoreEvent::Notification(notification)) => {
                eprintln!("[!] {}", notification.message);
            }
            Ok(StoreEvent::NavigateTo { activity_id }) => {
                info!("跳转到活动详情: {}", activity_id);
            }
            Ok(StoreEvent::Changed { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("事件处理落后，跳过 {} 条", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// 取出已缓冲的日志，统计 WARN / ERROR 条数
///
/// 落后被丢弃的日志不计入
pub fn count_problems(receiver: &mut Receiver<LogMessage>) -> usize {
    let mut problems = 0;
    loop {
        match receiver.try_recv() {
            Ok(log) => {
                if matches!(log.level.as_str(), "WARN" | "ERROR") {
                    problems += 1;
                }
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    problems
}

/// 把按日期分组的视图渲染为文本
pub fn render_dashboard(store: &ActivityStore) -> String {
    let mut out = String::new();
    let groups = store.activities_by_date();
    if groups.is_empty() {
        out.push_str("(no activities)\n");
        return out;
    }

    for group in groups {
        let _ = writeln!(out, "== {}", group.label());
        for activity in &group.activities {
            let badge = if activity.is_host {
                " [hosting]"
            } else if activity.is_going {
                " [going]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  {}  {} ({}) @ {}, {} - {} attending{}",
                activity.date.format("%H:%M"),
                activity.title,
                activity.category,
                activity.venue,
                activity.city,
                activity.attendees.len(),
                badge
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::ViewerActor;
    use crate::api::fake::FakeActivityApi;
    use crate::event_bus::EventBus;
    use crate::models::{normalize_wire_date, Activity, Viewer};

    #[tokio::test]
    async fn test_render_dashboard() {
        let bob = Viewer::new("bob", "Bob");
        let mut first = Activity::new(
            "Museum trip",
            "culture",
            normalize_wire_date("2021-05-01T09:00:00").unwrap(),
            "London",
            "British Museum",
        );
        first.id = "1".to_string();
        first.attendees.push(bob.as_attendee(true));
        let mut second = Activity::new(
            "Pub night",
            "drinks",
            normalize_wire_date("2021-05-02T20:30:00").unwrap(),
            "London",
            "Pub",
        );
        second.id = "2".to_string();

        let (actor, viewer) = ViewerActor::new(Some(bob));
        tokio::spawn(actor.run());
        let store = ActivityStore::new(
            Arc::new(FakeActivityApi::with_activities(vec![second, first])),
            Arc::new(viewer),
            Arc::new(EventBus::default()),
        );
        store.load_all().await;

        let text = render_dashboard(&store);
        let expected = "== 2021-05-01\n  09:00  Museum trip (culture) @ British Museum, London - 1 attending [hosting]\n== 2021-05-02\n  20:30  Pub night (drinks) @ Pub, London - 0 attending\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_count_problems_from_store_failures() {
        use crate::logger::BroadcastLayer;
        use tracing_subscriber::layer::SubscriberExt;

        let broadcaster = Arc::new(LogBroadcaster::new());
        let mut receiver = broadcaster.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(BroadcastLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("已加载 0 个活动");
            tracing::warn!("没有可显示的活动");
            tracing::error!("加载活动列表失败");
        });

        assert_eq!(count_problems(&mut receiver), 2);
        assert_eq!(count_problems(&mut receiver), 0);
    }

    #[tokio::test]
    async fn test_render_empty_dashboard() {
        let (actor, viewer) = ViewerActor::new(None);
        drop(actor);
        let store = ActivityStore::new(
            Arc::new(FakeActivityApi::new()),
            Arc::new(viewer),
            Arc::new(EventBus::default()),
        );
        assert_eq!(render_dashboard(&store), "(no activities)\n");
    }
}
