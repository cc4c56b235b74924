// 事件总线 - 用于状态仓库与界面层解耦通信
//
// 仓库在每次原子状态变更后发布事件，订阅方收到后重新读取投影
// 使用 tokio::sync::broadcast 实现高效的事件分发

use tokio::sync::broadcast;
use crate::notify::Notification;

/// 仓库事件枚举 - 定义所有可能的状态事件
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// 仓库状态已变更（数据或标志位），携带变更后的版本号
    Changed {
        version: u64,
    },

    /// 请求跳转到活动详情（创建/编辑成功后）
    NavigateTo {
        activity_id: String,
    },

    /// 面向用户的提示消息
    Notification(Notification),
}

/// 事件总线 - 用于模块间解耦通信
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: StoreEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
