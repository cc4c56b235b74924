// 用户提示 - 操作失败时的固定提示文案

use serde::Serialize;

/// 提示类型（每类操作一条固定文案）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// 创建活动失败
    Create,
    /// 编辑活动失败
    Update,
    /// 删除活动失败
    Delete,
    /// 报名失败
    Attend,
    /// 取消报名失败
    Unattend,
}

impl NotificationKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Create => "Problem creating activity",
            Self::Update => "Problem updating activity",
            Self::Delete => "Problem deleting activity",
            Self::Attend => "Problem signing up to activity",
            Self::Unattend => "Problem cancelling attendance",
        }
    }
}

/// 短暂显示的用户提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinct() {
        let kinds = [
            NotificationKind::Create,
            NotificationKind::Update,
            NotificationKind::Delete,
            NotificationKind::Attend,
            NotificationKind::Unattend,
        ];
        let mut messages: Vec<&str> = kinds.iter().map(|k| k.message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());

        assert_ne!(
            NotificationKind::Create.message(),
            NotificationKind::Update.message()
        );
        assert_eq!(
            Notification::new(NotificationKind::Unattend).message,
            "Problem cancelling attendance"
        );
    }
}
