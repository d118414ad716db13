//! MQTT topic names and filters.
//!
//! A filter is a `/`-separated list of levels where `+` matches exactly one
//! level and a trailing `#` matches the parent level and everything below.

use super::BusError;

fn invalid(topic: &str, reason: &'static str) -> BusError {
    BusError::InvalidTopic {
        topic: topic.to_string(),
        reason,
    }
}

/// Validates a topic filter used to subscribe.
pub fn validate_subscribe_topic(filter: &str) -> Result<(), BusError> {
    if filter.is_empty() {
        return Err(invalid(filter, "topic must not be empty"));
    }
    if filter.contains('\0') {
        return Err(invalid(filter, "topic must not contain a NUL character"));
    }

    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    for (index, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || index != last) {
            return Err(invalid(
                filter,
                "'#' must be the whole last level of the filter",
            ));
        }
        if level.contains('+') && *level != "+" {
            return Err(invalid(filter, "'+' must occupy a whole level"));
        }
    }

    Ok(())
}

/// Validates a concrete topic name used to publish (no wildcards).
pub fn validate_publish_topic(topic: &str) -> Result<(), BusError> {
    if topic.is_empty() {
        return Err(invalid(topic, "topic must not be empty"));
    }
    if topic.contains('\0') {
        return Err(invalid(topic, "topic must not contain a NUL character"));
    }
    if topic.contains(['+', '#']) {
        return Err(invalid(topic, "wildcards are not allowed in a topic name"));
    }
    Ok(())
}

/// Returns true when `topic` is matched by `filter`.
pub fn matches(filter: &str, topic: &str) -> bool {
    // Topics starting with '$' are never matched by a leading wildcard
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Returns true when some topic name is matched by both filters.
pub fn overlaps(first: &str, second: &str) -> bool {
    let system = |f: &str| f.starts_with('$');
    let wildcard = |f: &str| f.starts_with('+') || f.starts_with('#');
    if (system(first) && wildcard(second)) || (system(second) && wildcard(first)) {
        return false;
    }

    let mut first_levels = first.split('/');
    let mut second_levels = second.split('/');

    loop {
        match (first_levels.next(), second_levels.next()) {
            (Some("#"), _) | (_, Some("#")) => return true,
            (Some("+"), Some(_)) | (Some(_), Some("+")) => continue,
            (Some(a), Some(b)) if a == b => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
