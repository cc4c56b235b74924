// 活动同步客户端 - 主库

// 声明模块
pub mod actors;
pub mod api;
pub mod app;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod notify;
pub mod settings;
pub mod store;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use actors::{ViewerActor, ViewerHandle};
use api::HttpActivityApi;
use event_bus::EventBus;
use logger::LogBroadcaster;
use settings::SettingsManager;

pub use api::ActivityApi;
pub use event_bus::StoreEvent;
pub use models::{Activity, Attendee, ClientSettings, Viewer};
pub use notify::{Notification, NotificationKind};
pub use store::{ActivityStore, DateGroup, StoreFlags};

/// 应用状态
///
/// 所有组件显式构造后注入仓库，不使用全局单例
/// - 仓库：活动缓存与变更操作
/// - 事件总线：仓库与界面层解耦通信
/// - 当前用户：Viewer Actor 的 Handle
#[derive(Clone)]
pub struct AppState {
    /// 活动仓库
    pub store: Arc<ActivityStore>,
    /// 事件总线
    pub event_bus: Arc<EventBus>,
    /// 当前用户
    pub viewer: ViewerHandle,
    /// 配置管理器
    pub settings: Arc<SettingsManager>,
    /// 日志广播器
    pub log_broadcaster: Arc<LogBroadcaster>,
}

impl AppState {
    /// 根据配置构建应用状态并启动 Viewer Actor
    ///
    /// 需要在 tokio 运行时内调用
    pub async fn initialize(
        settings: Arc<SettingsManager>,
        log_broadcaster: Arc<LogBroadcaster>,
    ) -> Result<Self> {
        let config = settings.get().await;

        let api = HttpActivityApi::new(&settings.api_base_url().await, config.request_timeout_secs)?;
        info!("活动接口地址: {}", api.base_url());

        let event_bus = Arc::new(EventBus::new(config.event_capacity));

        let (viewer_actor, viewer) = ViewerActor::new(config.viewer.clone());
        tokio::spawn(async move {
            viewer_actor.run().await;
        });

        let store = Arc::new(ActivityStore::new(
            Arc::new(api),
            Arc::new(viewer.clone()),
            event_bus.clone(),
        ));

        Ok(Self {
            store,
            event_bus,
            viewer,
            settings,
            log_broadcaster,
        })
    }
}
