// 活动状态仓库 - 本地缓存与远程接口保持一致
//
// 所有变更操作都在网络调用处挂起，返回后在一次写锁内同时写入数据并清除标志位，
// 随后发布一次 Changed 事件。读取投影是同步的，锁从不跨越 await。

pub mod grouping;
mod state;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actors::ViewerProvider;
use crate::api::ActivityApi;
use crate::event_bus::{EventBus, StoreEvent};
use crate::models::Activity;
use crate::notify::{Notification, NotificationKind};
use crate::utils::validate_activity_id;

pub use grouping::{group_by_date, DateGroup};
pub use state::StoreFlags;
use state::StoreState;

/// 活动仓库
///
/// 显式构造并注入依赖，由调用方以 `Arc` 共享。
/// 同一活动上的并发变更不做互斥，调用方应在 `submitting` / `loading`
/// 为 true 时禁用对应控件；若仍并发提交，以最后返回的响应为准。
pub struct ActivityStore {
    api: Arc<dyn ActivityApi>,
    viewer: Arc<dyn ViewerProvider>,
    events: Arc<EventBus>,
    state: RwLock<StoreState>,
}

impl ActivityStore {
    /// 创建空仓库
    pub fn new(
        api: Arc<dyn ActivityApi>,
        viewer: Arc<dyn ViewerProvider>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            api,
            viewer,
            events,
            state: RwLock::new(StoreState::default()),
        }
    }

    // ========== 读取投影 ==========

    /// 所有活动，按时间升序
    pub fn activities(&self) -> Vec<Activity> {
        let mut activities: Vec<Activity> = self.read().registry.values().cloned().collect();
        grouping::sort_by_date(&mut activities);
        activities
    }

    /// 按日期分组的活动，每次读取时根据当前缓存重新计算
    pub fn activities_by_date(&self) -> Vec<DateGroup> {
        let activities: Vec<Activity> = self.read().registry.values().cloned().collect();
        group_by_date(activities)
    }

    /// 从缓存获取活动（不访问网络）
    pub fn get(&self, id: &str) -> Option<Activity> {
        self.read().registry.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().registry.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().registry.is_empty()
    }

    /// 当前聚焦的活动
    pub fn selected(&self) -> Option<Activity> {
        self.read().selected_activity().cloned()
    }

    /// 标志位快照
    pub fn flags(&self) -> StoreFlags {
        self.read().flags.clone()
    }

    /// 状态版本号，每次变更后递增
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// 订阅仓库事件
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ========== 聚焦 ==========

    /// 聚焦缓存中的活动，不存在时返回 None
    pub fn select(&self, id: &str) -> Option<Activity> {
        let found = self.get(id)?;
        self.transition(|state| state.selected = Some(id.to_string()));
        Some(found)
    }

    /// 清除聚焦
    pub fn clear_selection(&self) {
        self.transition(|state| state.selected = None);
    }

    // ========== 加载 ==========

    /// 加载全部活动
    ///
    /// 成功后缓存与服务端返回的集合完全一致（重复ID以最后一条为准），
    /// 返回写入的条数。失败时保留原有缓存，只记录日志。
    pub async fn load_all(&self) -> usize {
        self.transition(StoreState::begin_load);

        match self.api.list().await {
            Ok(activities) => {
                let viewer = self.viewer.current_viewer().await;

                let mut registry = HashMap::with_capacity(activities.len());
                for mut activity in activities {
                    activity.apply_viewer(viewer.as_ref());
                    registry.insert(activity.id.clone(), activity);
                }
                let count = registry.len();

                self.transition(|state| {
                    let focus_kept = state
                        .selected
                        .as_ref()
                        .map_or(true, |id| registry.contains_key(id));
                    if !focus_kept {
                        state.selected = None;
                    }
                    state.registry = registry;
                    state.end_load();
                });

                info!("已加载 {} 个活动", count);
                count
            }
            Err(e) => {
                self.transition(StoreState::end_load);
                error!("加载活动列表失败: {:#}", e);
                0
            }
        }
    }

    /// 加载单个活动
    ///
    /// 缓存命中时直接返回并聚焦，不访问网络（书签/刷新场景下缓存可能为空）。
    pub async fn load_one(&self, id: &str) -> Option<Activity> {
        if let Err(e) = validate_activity_id(id) {
            warn!("{}", e);
            return None;
        }

        if let Some(cached) = self.select(id) {
            debug!("活动 {} 命中缓存", id);
            return Some(cached);
        }

        self.transition(StoreState::begin_load);

        match self.api.details(id).await {
            Ok(Some(mut activity)) => {
                let viewer = self.viewer.current_viewer().await;
                activity.apply_viewer(viewer.as_ref());

                let stored = activity.clone();
                self.transition(|state| {
                    state.selected = Some(activity.id.clone());
                    state.registry.insert(activity.id.clone(), activity);
                    state.end_load();
                });
                Some(stored)
            }
            Ok(None) => {
                self.transition(StoreState::end_load);
                warn!("活动 {} 不存在", id);
                None
            }
            Err(e) => {
                self.transition(StoreState::end_load);
                error!("加载活动 {} 失败: {:#}", id, e);
                None
            }
        }
    }

    // ========== 变更 ==========

    /// 创建活动
    ///
    /// ID 为空时在客户端生成。成功后当前用户作为唯一的发起人参与者，
    /// 活动被聚焦并发布跳转事件。
    pub async fn create(&self, mut activity: Activity) -> Option<Activity> {
        if activity.id.trim().is_empty() {
            activity.id = Uuid::new_v4().to_string();
        }
        if let Err(e) = validate_activity_id(&activity.id) {
            warn!("{}", e);
            self.notify(NotificationKind::Create);
            return None;
        }

        let Some(viewer) = self.viewer.current_viewer().await else {
            warn!("未登录，无法创建活动");
            self.notify(NotificationKind::Create);
            return None;
        };

        self.transition(|state| state.flags.submitting = true);

        match self.api.create(&activity).await {
            Ok(()) => {
                activity.attendees = vec![viewer.as_attendee(true)];
                activity.is_host = true;
                activity.is_going = true;

                let id = activity.id.clone();
                let stored = activity.clone();
                self.transition(|state| {
                    state.registry.insert(id.clone(), activity);
                    state.selected = Some(id.clone());
                    state.flags.submitting = false;
                });

                info!("活动 {} 已创建", id);
                self.events.publish(StoreEvent::NavigateTo { activity_id: id });
                Some(stored)
            }
            Err(e) => {
                self.transition(|state| state.flags.submitting = false);
                error!("创建活动失败: {:#}", e);
                self.notify(NotificationKind::Create);
                None
            }
        }
    }

    /// 编辑活动，要求活动已在缓存中
    ///
    /// 成功后整体替换缓存条目（不合并字段），聚焦并发布跳转事件。
    pub async fn update(&self, mut activity: Activity) -> Option<Activity> {
        if let Err(e) = validate_activity_id(&activity.id) {
            warn!("{}", e);
            return None;
        }
        if !self.contains(&activity.id) {
            warn!("活动 {} 不在缓存中，忽略编辑", activity.id);
            return None;
        }

        self.transition(|state| state.flags.submitting = true);

        match self.api.update(&activity).await {
            Ok(()) => {
                let viewer = self.viewer.current_viewer().await;
                activity.apply_viewer(viewer.as_ref());

                let id = activity.id.clone();
                let stored = activity.clone();
                self.transition(|state| {
                    state.registry.insert(id.clone(), activity);
                    state.selected = Some(id.clone());
                    state.flags.submitting = false;
                });

                info!("活动 {} 已更新", id);
                self.events.publish(StoreEvent::NavigateTo { activity_id: id });
                Some(stored)
            }
            Err(e) => {
                self.transition(|state| state.flags.submitting = false);
                error!("编辑活动 {} 失败: {:#}", activity.id, e);
                self.notify(NotificationKind::Update);
                None
            }
        }
    }

    /// 删除活动
    ///
    /// `target` 为触发删除的控件名，进行中时用于行级加载提示
    pub async fn delete(&self, id: &str, target: &str) -> bool {
        if let Err(e) = validate_activity_id(id) {
            warn!("{}", e);
            return false;
        }

        self.transition(|state| {
            state.flags.submitting = true;
            state.flags.target = target.to_string();
        });

        match self.api.delete(id).await {
            Ok(()) => {
                self.transition(|state| {
                    state.registry.remove(id);
                    if state.selected.as_deref() == Some(id) {
                        state.selected = None;
                    }
                    state.flags.submitting = false;
                    state.flags.target.clear();
                });
                info!("活动 {} 已删除", id);
                true
            }
            Err(e) => {
                self.transition(|state| {
                    state.flags.submitting = false;
                    state.flags.target.clear();
                });
                error!("删除活动 {} 失败: {:#}", id, e);
                self.notify(NotificationKind::Delete);
                false
            }
        }
    }

    /// 报名参加活动
    pub async fn attend(&self, id: &str) -> bool {
        self.change_attendance(id, true).await
    }

    /// 取消报名
    pub async fn unattend(&self, id: &str) -> bool {
        self.change_attendance(id, false).await
    }

    async fn change_attendance(&self, id: &str, going: bool) -> bool {
        let kind = if going {
            NotificationKind::Attend
        } else {
            NotificationKind::Unattend
        };

        if !self.contains(id) {
            warn!("活动 {} 不在缓存中，无法变更报名", id);
            return false;
        }

        let Some(viewer) = self.viewer.current_viewer().await else {
            warn!("未登录，无法变更报名");
            self.notify(kind);
            return false;
        };

        self.transition(|state| state.flags.loading = true);

        let result = if going {
            self.api.attend(id).await
        } else {
            self.api.unattend(id).await
        };

        match result {
            Ok(()) => {
                let written = self.transition(|state| {
                    state.flags.loading = false;
                    let Some(activity) = state.registry.get_mut(id) else {
                        return false;
                    };
                    if going {
                        if !activity.has_attendee(&viewer.username) {
                            activity.attendees.push(viewer.as_attendee(false));
                        }
                    } else {
                        activity.attendees.retain(|a| a.username != viewer.username);
                    }
                    activity.apply_viewer(Some(&viewer));
                    true
                });
                if !written {
                    // 请求期间活动已被删除或刷新移除
                    warn!("活动 {} 已不在缓存中，报名结果未写回", id);
                    return false;
                }
                info!(
                    "用户 {} {} 活动 {}",
                    viewer.username,
                    if going { "报名" } else { "取消报名" },
                    id
                );
                true
            }
            Err(e) => {
                self.transition(|state| state.flags.loading = false);
                error!("变更活动 {} 报名失败: {:#}", id, e);
                self.notify(kind);
                false
            }
        }
    }

    /// 当前用户切换后重新计算所有活动的 `is_going` / `is_host`
    pub async fn refresh_viewer_flags(&self) {
        let viewer = self.viewer.current_viewer().await;
        self.transition(|state| {
            for activity in state.registry.values_mut() {
                activity.apply_viewer(viewer.as_ref());
            }
        });
    }

    // ========== 内部工具 ==========

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 在一次写锁内应用变更，然后发布 Changed 事件
    fn transition<R>(&self, apply: impl FnOnce(&mut StoreState) -> R) -> R {
        let (result, version) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let result = apply(&mut state);
            state.version += 1;
            (result, state.version)
        };
        self.events.publish(StoreEvent::Changed { version });
        result
    }

    fn notify(&self, kind: NotificationKind) {
        let notification = Notification::new(kind);
        warn!("用户提示: {}", notification.message);
        self.events.publish(StoreEvent::Notification(notification));
    }
}
