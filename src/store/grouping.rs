// 按日期分组 - 纯函数投影，不持有任何状态

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Activity;

/// 同一天的活动
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub activities: Vec<Activity>,
}

impl DateGroup {
    /// 日期标签，如 `2021-05-01`
    pub fn label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// 按完整时间升序排序，时间相同按 id 排序
pub fn sort_by_date(activities: &mut [Activity]) {
    activities.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

/// 先按时间排序，再按日期切分
///
/// 分组顺序由各组第一个活动的时间决定，组内保持时间升序
pub fn group_by_date<I>(activities: I) -> Vec<DateGroup>
where
    I: IntoIterator<Item = Activity>,
{
    let mut sorted: Vec<Activity> = activities.into_iter().collect();
    sort_by_date(&mut sorted);

    let mut groups: Vec<DateGroup> = Vec::new();
    for activity in sorted {
        let date = activity.calendar_date();
        match groups.last_mut() {
            Some(group) if group.date == date => group.activities.push(activity),
            _ => groups.push(DateGroup {
                date,
                activities: vec![activity],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_wire_date;

    fn activity(id: &str, date: &str) -> Activity {
        let mut a = Activity::new(id, "drinks", normalize_wire_date(date).unwrap(), "London", "Pub");
        a.id = id.to_string();
        a
    }

    #[test]
    fn test_group_by_date_order() {
        let groups = group_by_date(vec![
            activity("ten", "2021-05-01T10:00"),
            activity("nine", "2021-05-01T09:00"),
            activity("eight", "2021-05-02T08:00"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label(), "2021-05-01");
        assert_eq!(groups[1].label(), "2021-05-02");

        let first: Vec<&str> = groups[0].activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(first, vec!["nine", "ten"]);
        assert_eq!(groups[1].activities[0].id, "eight");
    }

    #[test]
    fn test_group_by_date_empty() {
        assert!(group_by_date(Vec::new()).is_empty());
    }

    #[test]
    fn test_same_timestamp_sorted_by_id() {
        let groups = group_by_date(vec![
            activity("b", "2021-06-01T12:00"),
            activity("a", "2021-06-01T12:00"),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].activities[0].id, "a");
        assert_eq!(groups[0].activities[1].id, "b");
    }
}
