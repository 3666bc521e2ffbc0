//! Database models

use crate::order_key::OrderKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item on a concert program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub id: String,
    pub concert_id: String,
    pub title: String,
    pub composer: String,
    pub performers: String,
    pub order_key: OrderKey,
}

/// A concert and its program in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concert {
    pub id: String,
    pub date: DateTime<Utc>,
    pub passcode: String,
    pub frozen: bool,
    pub performances: Vec<Performance>,
}

/// Fields supplied when creating a performance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceDraft {
    pub title: String,
    pub composer: String,
    pub performers: String,
}

/// Partial update of a performance's text fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceChanges {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub performers: Option<String>,
}

impl PerformanceChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.composer.is_none() && self.performers.is_none()
    }
}

/// Partial update of a concert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcertChanges {
    pub date: Option<DateTime<Utc>>,
    pub passcode: Option<String>,
    pub frozen: Option<bool>,
}

/// Sort performances into display order
///
/// Ascending normalized order key; ties (duplicate keys left behind by racing
/// writers) fall back to id so the order is at least stable.
pub fn sort_program(performances: &mut [Performance]) {
    performances.sort_by(|a, b| a.order_key.cmp(&b.order_key).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf(id: &str, key: &str) -> Performance {
        Performance {
            id: id.to_string(),
            concert_id: "c".to_string(),
            title: id.to_string(),
            composer: String::new(),
            performers: String::new(),
            order_key: OrderKey::parse(key).unwrap(),
        }
    }

    #[test]
    fn test_sort_mixes_schemes_by_value() {
        // "b" (legacy alpha) is ~324,000; "2" (legacy integer) is 2; canonical 1500
        let mut program = vec![perf("alpha", "b"), perf("int", "2"), perf("canon", "0001500.000")];
        sort_program(&mut program);
        let ids: Vec<&str> = program.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["int", "canon", "alpha"]);
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let mut program = vec![perf("z", "1"), perf("a", "0000001.000")];
        sort_program(&mut program);
        assert_eq!(program[0].id, "a");
    }

    #[test]
    fn test_sort_deep_legacy_codes_by_text() {
        // Same value past the significant prefix; ids would put "first" last
        let mut program = vec![perf("first", "ammmmmmmmmmmmb"), perf("aaa", "ammmmmmmmmmmmc")];
        sort_program(&mut program);
        let ids: Vec<&str> = program.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "aaa"]);
    }
}
