use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_age;

/// A value stamped with the moment it was cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn at(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }

    /// True when the entry is strictly older than `max_age` at `now`.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age_at(now) > max_age
    }

    pub fn age_display_at(&self, now: DateTime<Utc>) -> String {
        format_age(self.cached_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_data_age_display() {
        let now = Utc::now();
        assert_eq!(CachedData::at(1, now).age_display_at(now), "just now");
        assert_eq!(CachedData::at(1, now - Duration::minutes(5)).age_display_at(now), "5m ago");
        assert_eq!(CachedData::at(1, now - Duration::minutes(95)).age_display_at(now), "2h ago");
        assert_eq!(CachedData::at(1, now - Duration::minutes(80)).age_display_at(now), "1h ago");
        assert_eq!(CachedData::at(1, now - Duration::days(3)).age_display_at(now), "3d ago");
        // Clock skew
        assert_eq!(CachedData::at(1, now + Duration::minutes(5)).age_display_at(now), "just now");
    }

    #[test]
    fn test_is_older_than() {
        let now = Utc::now();
        let cached = CachedData::at(vec![1], now - Duration::minutes(31));
        assert!(cached.is_older_than(Duration::minutes(30), now));
        assert!(!cached.is_older_than(Duration::minutes(60), now));
    }
}
