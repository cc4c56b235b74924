// Viewer Actor - 使用Actor模式管理当前登录用户
//
// 仓库在每次入库和报名变更时查询当前用户，用消息传递替代共享锁

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::models::Viewer;

/// 当前用户提供方
#[async_trait]
pub trait ViewerProvider: Send + Sync {
    /// 获取当前用户，未登录时返回 None
    async fn current_viewer(&self) -> Option<Viewer>;
}

/// 当前用户命令
pub enum ViewerCommand {
    /// 设置当前用户（登录）
    Set {
        viewer: Viewer,
    },

    /// 清除当前用户（登出）
    Clear,

    /// 获取当前用户
    Get {
        reply: oneshot::Sender<Option<Viewer>>,
    },
}

/// 当前用户Actor
pub struct ViewerActor {
    receiver: mpsc::Receiver<ViewerCommand>,
    viewer: Option<Viewer>,
}

impl ViewerActor {
    /// 创建新的Actor
    pub fn new(viewer: Option<Viewer>) -> (Self, ViewerHandle) {
        let (sender, receiver) = mpsc::channel(10);
        let actor = Self { receiver, viewer };
        let handle = ViewerHandle { sender };
        (actor, handle)
    }

    /// 运行Actor
    pub async fn run(mut self) {
        tracing::info!("Viewer Actor 已启动");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                ViewerCommand::Set { viewer } => {
                    tracing::info!("当前用户已切换: {}", viewer.username);
                    self.viewer = Some(viewer);
                }

                ViewerCommand::Clear => {
                    self.viewer = None;
                    tracing::info!("当前用户已清除");
                }

                ViewerCommand::Get { reply } => {
                    let _ = reply.send(self.viewer.clone());
                }
            }
        }

        tracing::info!("Viewer Actor 已停止");
    }
}

/// 当前用户Handle
#[derive(Clone)]
pub struct ViewerHandle {
    sender: mpsc::Sender<ViewerCommand>,
}

impl ViewerHandle {
    /// 设置当前用户
    pub async fn set(&self, viewer: Viewer) {
        let _ = self.sender.send(ViewerCommand::Set { viewer }).await;
    }

    /// 清除当前用户
    pub async fn clear(&self) {
        let _ = self.sender.send(ViewerCommand::Clear).await;
    }

    /// 获取当前用户
    ///
    /// Actor 已停止时返回 None
    pub async fn get(&self) -> Option<Viewer> {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(ViewerCommand::Get { reply }).await.is_err() {
            return None;
        }
        rx.await.unwrap_or(None)
    }
}

#[async_trait]
impl ViewerProvider for ViewerHandle {
    async fn current_viewer(&self) -> Option<Viewer> {
        self.get().await
    }
}
