use chrono::Utc;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36_suffix(len: usize) -> String {
    (0..len)
        .map(|_| BASE36[fastrand::usize(..BASE36.len())] as char)
        .collect()
}

/// `user_<unix-millis>_<5 base36 chars>`
pub fn new_user_id() -> String {
    format!("user_{}_{}", Utc::now().timestamp_millis(), base36_suffix(5))
}

/// `bill_<unix-millis>_<9 base36 chars>`
pub fn new_bill_id() -> String {
    format!("bill_{}_{}", Utc::now().timestamp_millis(), base36_suffix(9))
}

/// Current time the way bill dates are stored, e.g. `2024-05-01T10:00:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::HashSet;

    #[test]
    fn test_user_id_shape() {
        let id = new_user_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 5);
    }

    #[test]
    fn test_bill_ids_are_distinct() {
        let ids: HashSet<String> = (0..100).map(|_| new_bill_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("bill_")));
    }

    #[test]
    fn test_now_timestamp_is_rfc3339_utc_millis() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-05-01T10:00:00.000Z".len());
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
