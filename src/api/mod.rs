// 远程接口抽象层 - 定义活动资源的 REST 操作

pub mod http;

#[cfg(test)]
pub mod fake;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Activity;

pub use http::HttpActivityApi;

/// 活动接口 - 所有远程实现必须实现此 trait
///
/// 传输失败和非 2xx 响应统一返回 `Err`，
/// 资源不存在由 `details` 以 `Ok(None)` 表示。
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// 获取全部活动（顺序不保证）
    async fn list(&self) -> Result<Vec<Activity>>;

    /// 获取单个活动，不存在时返回 None
    async fn details(&self, id: &str) -> Result<Option<Activity>>;

    /// 创建活动
    async fn create(&self, activity: &Activity) -> Result<()>;

    /// 更新活动
    async fn update(&self, activity: &Activity) -> Result<()>;

    /// 删除活动
    async fn delete(&self, id: &str) -> Result<()>;

    /// 报名参加
    async fn attend(&self, id: &str) -> Result<()>;

    /// 取消报名
    async fn unattend(&self, id: &str) -> Result<()>;
}
