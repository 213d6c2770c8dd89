/// Registry identity of a tab: "{device_id}:{tab_id}"
pub fn make_tab_key(device_id: &str, tab_id: &str) -> String {
    format!("{}:{}", device_id, tab_id)
}

/// Split a tab key into (device_id, tab_id).
/// Device ids never contain ':', so the first separator is the boundary.
pub fn split_tab_key(tab_key: &str) -> Option<(&str, &str)> {
    let (device_id, tab_id) = tab_key.split_once(':')?;
    if device_id.is_empty() || tab_id.is_empty() {
        return None;
    }
    Some((device_id, tab_id))
}

/// Check if a tab key belongs to a specific device.
pub fn is_device_tab(tab_key: &str, device_id: &str) -> bool {
    split_tab_key(tab_key).is_some_and(|(device, _)| device == device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_tab_key_format() {
        assert_eq!(make_tab_key("laptop", "tab-a"), "laptop:tab-a");
    }

    #[test]
    fn split_tab_key_valid() {
        assert_eq!(split_tab_key("remote:tab-1"), Some(("remote", "tab-1")));
        // Tab ids may themselves contain ':'
        assert_eq!(split_tab_key("dev:a:b"), Some(("dev", "a:b")));
    }

    #[test]
    fn split_tab_key_rejects_malformed() {
        assert_eq!(split_tab_key("no-separator"), None);
        assert_eq!(split_tab_key(":tab"), None);
        assert_eq!(split_tab_key("dev:"), None);
    }

    #[test]
    fn is_device_tab_true_and_false() {
        assert!(is_device_tab("laptop:t1", "laptop"));
        assert!(!is_device_tab("desktop:t1", "laptop"));
        assert!(!is_device_tab("garbage", "laptop"));
    }
}
