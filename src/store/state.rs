// 仓库内部状态

use std::collections::HashMap;

use serde::Serialize;

use crate::models::Activity;

/// 进行中操作的标志位
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreFlags {
    /// 列表或单个活动正在加载
    pub loading_initial: bool,
    /// 创建/编辑/删除正在提交
    pub submitting: bool,
    /// 报名/取消报名正在进行
    pub loading: bool,
    /// 触发删除的控件名，空字符串表示无
    pub target: String,
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub registry: HashMap<String, Activity>,
    /// 当前聚焦的活动ID
    pub selected: Option<String>,
    pub flags: StoreFlags,
    /// 每次状态变更递增
    pub version: u64,
    /// 进行中的 load_all / load_one 数量
    pub loads_in_flight: usize,
}

impl StoreState {
    /// 选中的活动，已被删除时返回 None
    pub fn selected_activity(&self) -> Option<&Activity> {
        self.selected
            .as_ref()
            .and_then(|id| self.registry.get(id))
    }

    pub fn begin_load(&mut self) {
        self.loads_in_flight += 1;
        self.flags.loading_initial = true;
    }

    /// 最后一个加载结束时才清除 loading_initial
    pub fn end_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        self.flags.loading_initial = self.loads_in_flight > 0;
    }
}
