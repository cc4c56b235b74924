// 测试用内存接口 - 支持注入失败和统计调用次数

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use super::ActivityApi;
use crate::models::Activity;

/// 内存中的活动接口
#[derive(Default)]
pub struct FakeActivityApi {
    /// 服务端“数据库”，按返回顺序保存
    server: Mutex<Vec<Activity>>,
    /// 为 true 时所有调用都返回网络错误
    offline: AtomicBool,
    list_calls: AtomicUsize,
    details_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
    /// 设置后每次调用都要等待放行
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeActivityApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activities(activities: Vec<Activity>) -> Self {
        let api = Self::default();
        *api.server.lock().unwrap() = activities;
        api
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_activities(&self, activities: Vec<Activity>) {
        *self.server.lock().unwrap() = activities;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    /// 挂起后续调用，直到对返回的 Notify 调用 `notify_one`
    pub fn hold_calls(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("network error: connection refused"));
        }
        Ok(())
    }

    async fn record_mutation(&self) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.check_online()
    }
}

#[async_trait]
impl ActivityApi for FakeActivityApi {
    async fn list(&self) -> Result<Vec<Activity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.check_online()?;
        Ok(self.server.lock().unwrap().clone())
    }

    async fn details(&self, id: &str) -> Result<Option<Activity>> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.check_online()?;
        let server = self.server.lock().unwrap();
        Ok(server.iter().rev().find(|a| a.id == id).cloned())
    }

    async fn create(&self, activity: &Activity) -> Result<()> {
        self.record_mutation().await?;
        self.server.lock().unwrap().push(activity.clone());
        Ok(())
    }

    async fn update(&self, activity: &Activity) -> Result<()> {
        self.record_mutation().await?;
        let mut server = self.server.lock().unwrap();
        match server.iter_mut().find(|a| a.id == activity.id) {
            Some(existing) => {
                *existing = activity.clone();
                Ok(())
            }
            None => Err(anyhow!("404 Not Found")),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record_mutation().await?;
        self.server.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn attend(&self, _id: &str) -> Result<()> {
        self.record_mutation().await
    }

    async fn unattend(&self, _id: &str) -> Result<()> {
        self.record_mutation().await
    }
}

