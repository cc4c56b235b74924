// 数据模型模块 - 定义活动、参与者和当前用户

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 内存中统一使用的时间格式（无小数秒、无时区）
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 不带秒的时间格式（表单提交时常见）
const SHORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 活动参与者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// 用户名（唯一标识）
    pub username: String,
    /// 显示名称
    pub display_name: String,
    /// 是否为活动发起人
    #[serde(default)]
    pub is_host: bool,
    /// 头像地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// 活动数据结构
///
/// `is_host` / `is_going` 相对于当前用户计算，入库时总会重新推导，
/// 不信任服务端返回的值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDateTime,
    pub city: String,
    pub venue: String,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_going: bool,
}

impl Activity {
    /// 创建一个尚未分配ID、没有参与者的活动
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        date: NaiveDateTime,
        city: impl Into<String>,
        venue: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            date,
            city: city.into(),
            venue: venue.into(),
            attendees: Vec::new(),
            is_host: false,
            is_going: false,
        }
    }

    /// 活动所在的日历日期（用于按日期分组）
    pub fn calendar_date(&self) -> NaiveDate {
        self.date.date()
    }

    /// 判断某个用户是否已报名
    pub fn has_attendee(&self, username: &str) -> bool {
        self.attendees.iter().any(|a| a.username == username)
    }

    /// 根据当前用户重新计算 `is_going` / `is_host`
    ///
    /// 没有当前用户时两者都为 false。
    pub fn apply_viewer(&mut self, viewer: Option<&Viewer>) {
        match viewer {
            Some(viewer) => {
                let entry = self
                    .attendees
                    .iter()
                    .find(|a| a.username == viewer.username);
                self.is_going = entry.is_some();
                self.is_host = entry.map(|a| a.is_host).unwrap_or(false);
            }
            None => {
                self.is_going = false;
                self.is_host = false;
            }
        }
    }
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Viewer {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            image: None,
        }
    }

    /// 将当前用户转换为参与者记录
    pub fn as_attendee(&self, is_host: bool) -> Attendee {
        Attendee {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            is_host,
            image: self.image.clone(),
        }
    }
}

/// 规范化服务端返回的时间字符串
///
/// 服务端格式为 ISO-8601，带小数秒，可能带时区后缀：
/// `2021-05-01T10:00:00.1234567Z` → `2021-05-01T10:00:00`
pub fn normalize_wire_date(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    let (day, time) = raw
        .split_once('T')
        .ok_or_else(|| anyhow!("无效的活动时间: {}", raw))?;

    // 截掉小数秒和时区部分
    let time = time
        .find(|c: char| matches!(c, '.' | 'Z' | 'z' | '+' | '-'))
        .map(|idx| &time[..idx])
        .unwrap_or(time);

    let stripped = format!("{}T{}", day, time);
    NaiveDateTime::parse_from_str(&stripped, CANONICAL_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&stripped, SHORT_DATE_FORMAT))
        .map_err(|e| anyhow!("无效的活动时间 {}: {}", raw, e))
}

/// 活动时间的序列化/反序列化（入库即规范化）
mod wire_date {
    use super::{normalize_wire_date, CANONICAL_DATE_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(CANONICAL_DATE_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        normalize_wire_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// 客户端配置更新（所有字段可选，只更新提供的部分）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettingsUpdate {
    /// 接口基础地址
    pub api_base_url: Option<String>,
    /// 请求超时（秒）
    pub request_timeout_secs: Option<u64>,
    /// 事件缓冲区大小
    pub event_capacity: Option<usize>,
    /// 日志级别
    pub log_level: Option<String>,
    /// 日志目录
    pub log_dir: Option<String>,
    /// 当前用户
    pub viewer: Option<Viewer>,
}

/// 持久化的客户端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 接口基础地址
    pub api_base_url: String,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 事件缓冲区大小
    pub event_capacity: usize,
    /// 日志级别（trace/debug/info/warn/error）
    pub log_level: String,
    /// 日志目录，为空时使用系统默认位置
    pub log_dir: Option<String>,
    /// 当前用户（会话由外部登录流程写入）
    pub viewer: Option<Viewer>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            event_capacity: 256,
            log_level: "info".to_string(),
            log_dir: None,
            viewer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, CANONICAL_DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_normalize_strips_fraction_and_timezone() {
        assert_eq!(
            normalize_wire_date("2021-05-01T10:00:00.1234567").unwrap(),
            at("2021-05-01T10:00:00")
        );
        assert_eq!(
            normalize_wire_date("2021-05-01T10:00:00.123Z").unwrap(),
            at("2021-05-01T10:00:00")
        );
        assert_eq!(
            normalize_wire_date("2021-05-01T10:00:00+02:00").unwrap(),
            at("2021-05-01T10:00:00")
        );
        assert_eq!(
            normalize_wire_date("2021-05-01T10:00").unwrap(),
            at("2021-05-01T10:00:00")
        );
    }

    #[test]
    fn test_normalize_rejects_date_only() {
        assert!(normalize_wire_date("2021-05-01").is_err());
        assert!(normalize_wire_date("not a date").is_err());
    }

    #[test]
    fn test_activity_deserialization() {
        let value = json!({
            "id": "42",
            "title": "Past Activity 1",
            "description": "Activity 2 months ago",
            "category": "drinks",
            "date": "2021-03-01T20:00:00.0000000",
            "city": "London",
            "venue": "Pub",
            "attendees": [
                { "username": "bob", "displayName": "Bob", "isHost": true }
            ]
        });

        let activity: Activity = serde_json::from_value(value).unwrap();
        assert_eq!(activity.id, "42");
        assert_eq!(activity.date, at("2021-03-01T20:00:00"));
        assert_eq!(activity.attendees.len(), 1);
        assert!(activity.attendees[0].is_host);
        assert!(!activity.is_going);

        // 序列化时使用规范格式
        let back = serde_json::to_value(&activity).unwrap();
        assert_eq!(back["date"], "2021-03-01T20:00:00");
        assert_eq!(back["attendees"][0]["displayName"], "Bob");
    }

    #[test]
    fn test_activity_without_attendees() {
        let value = json!({
            "id": "1",
            "title": "t",
            "category": "music",
            "date": "2021-05-01T09:00:00",
            "city": "Paris",
            "venue": "Olympia"
        });

        let activity: Activity = serde_json::from_value(value).unwrap();
        assert!(activity.attendees.is_empty());
        assert!(activity.description.is_empty());
    }

    #[test]
    fn test_apply_viewer() {
        let mut activity = Activity::new("t", "culture", at("2021-05-01T09:00:00"), "Paris", "Louvre");
        let bob = Viewer::new("bob", "Bob");
        let tom = Viewer::new("tom", "Tom");
        activity.attendees.push(bob.as_attendee(true));
        activity.attendees.push(tom.as_attendee(false));

        activity.apply_viewer(Some(&bob));
        assert!(activity.is_going);
        assert!(activity.is_host);

        activity.apply_viewer(Some(&tom));
        assert!(activity.is_going);
        assert!(!activity.is_host);

        activity.apply_viewer(Some(&Viewer::new("jane", "Jane")));
        assert!(!activity.is_going);
        assert!(!activity.is_host);

        activity.apply_viewer(None);
        assert!(!activity.is_going);
    }
}
