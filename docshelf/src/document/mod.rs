// Document bookkeeping - id generation and timestamp stamps

use chrono::Utc;
use uuid::Uuid;

/// Generate a fresh document identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as epoch milliseconds, the unit used by `_created`,
/// `_updated` and `_deleted` stamps.
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
