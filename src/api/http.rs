// 活动 REST 客户端
// 负责与服务端 /activities 接口交互

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error};

use super::ActivityApi;
use crate::models::Activity;

/// 基于 reqwest 的活动接口客户端
#[derive(Clone)]
pub struct HttpActivityApi {
    base_url: String,
    client: Client,
}

impl HttpActivityApi {
    /// 创建新的客户端
    ///
    /// `base_url` 形如 `http://localhost:5000/api`，末尾斜杠会被去掉
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Self::with_client(base_url, client)
    }

    /// 使用外部构建的客户端（共享连接池或自定义代理）
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(anyhow!("接口地址不能为空"));
        }
        let parsed = Url::parse(&base_url).with_context(|| format!("无效的接口地址: {}", base_url))?;
        if parsed.cannot_be_a_base() {
            return Err(anyhow!("接口地址无法拼接路径: {}", base_url));
        }

        Ok(Self { base_url, client })
    }

    /// 获取接口基础地址
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 拼接 `/activities/<segments...>`，每个路径段单独转义
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("接口地址无法拼接路径: {}", self.base_url))?
            .pop_if_empty()
            .push("activities")
            .extend(segments);
        Ok(url)
    }

    /// 非 2xx 响应转换为错误，附带服务端返回的 errors 信息
    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = describe_error_body(status, &body);
        error!("{}失败: {} {}", action, status, detail);
        Err(anyhow!("{}失败 ({}): {}", action, status, detail))
    }
}

/// 解析服务端错误中间件返回的 `{"errors": ...}`
///
/// errors 可能是字符串，也可能是 字段 → 消息列表 的对象
pub(crate) fn describe_error_body(status: StatusCode, body: &str) -> String {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        } else {
            trimmed.to_string()
        }
    };

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return fallback(),
    };

    match &value["errors"] {
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let mut parts: Vec<String> = fields
                .iter()
                .map(|(field, messages)| {
                    let text = match messages {
                        Value::Array(items) => items
                            .iter()
                            .filter_map(|m| m.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    format!("{}: {}", field, text)
                })
                .collect();
            parts.sort();
            parts.join("; ")
        }
        _ => fallback(),
    }
}

#[async_trait]
impl ActivityApi for HttpActivityApi {
    async fn list(&self) -> Result<Vec<Activity>> {
        let response = self.client.get(self.url(&[])?).send().await?;
        let response = Self::ensure_success(response, "获取活动列表").await?;
        let activities: Vec<Activity> = response
            .json()
            .await
            .context("解析活动列表失败")?;
        debug!("获取到 {} 个活动", activities.len());
        Ok(activities)
    }

    async fn details(&self, id: &str) -> Result<Option<Activity>> {
        let response = self
            .client
            .get(self.url(&[id])?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("活动 {} 不存在", id);
            return Ok(None);
        }

        let response = Self::ensure_success(response, "获取活动详情").await?;
        let activity: Activity = response
            .json()
            .await
            .with_context(|| format!("解析活动 {} 失败", id))?;
        Ok(Some(activity))
    }

    async fn create(&self, activity: &Activity) -> Result<()> {
        let response = self
            .client
            .post(self.url(&[])?)
            .json(activity)
            .send()
            .await?;
        Self::ensure_success(response, "创建活动").await?;
        Ok(())
    }

    async fn update(&self, activity: &Activity) -> Result<()> {
        let response = self
            .client
            .put(self.url(&[activity.id.as_str()])?)
            .json(activity)
            .send()
            .await?;
        Self::ensure_success(response, "更新活动").await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&[id])?)
            .send()
            .await?;
        Self::ensure_success(response, "删除活动").await?;
        Ok(())
    }

    async fn attend(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&[id, "attend"])?)
            .send()
            .await?;
        Self::ensure_success(response, "报名活动").await?;
        Ok(())
    }

    async fn unattend(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&[id, "attend"])?)
            .send()
            .await?;
        Self::ensure_success(response, "取消报名").await?;
        Ok(())
    }
}
