//! 输入验证工具函数
//!
//! 活动ID在进入缓存或发起请求之前校验，路径段由客户端负责转义

/// 验证活动ID是否有效
///
/// # 参数
/// - `id`: 活动ID
///
/// # 返回
/// - `Ok(())`: 验证通过
/// - `Err(String)`: 错误信息
pub fn validate_activity_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("活动 ID 不能为空".to_string());
    }
    if id.chars().any(char::is_control) {
        return Err(format!("无效的活动 ID: {:?}", id));
    }
    Ok(())
}
