//! Resource tag helpers and curfew marker tags
//!
//! ## Marker tags
//!
//! Resources the sweeper deactivates (but does not delete) are marked so
//! operators can see when and why:
//!
//! | Tag key | Value |
//! |---------|-------|
//! | `curfew:swept-at` | date the action was applied (`YYYY-MM-DD`) |
//! | `curfew:reason` | short reason, e.g. `idle-for-5-days` |
//!
//! ## Creation-time fallback
//!
//! Some control APIs report no creation timestamp (search domains, virtual
//! desktops). For those, a `curfew:created-at` tag in RFC 3339 format is
//! honored as the creation time; without it the resource has unknown age and
//! is never acted on.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Tag key marking when the sweeper acted on a resource
pub const TAG_SWEPT_AT: &str = "curfew:swept-at";

/// Tag key carrying the reason the sweeper acted
pub const TAG_SWEPT_REASON: &str = "curfew:reason";

/// Tag key honored as a creation timestamp for kinds whose API has none
pub const TAG_CREATED_AT: &str = "curfew:created-at";

/// Conventional name tag
pub const TAG_NAME: &str = "Name";

/// Extract tags from any SDK tag type into a map.
///
/// The service crates each define their own `Tag` type, but all expose
/// key/value string accessors; the closures adapt between them.
pub fn extract_tags<T>(
    tags: &[T],
    key: impl Fn(&T) -> Option<&str>,
    value: impl Fn(&T) -> Option<&str>,
) -> HashMap<String, String> {
    tags.iter()
        .filter_map(|t| match (key(t), value(t)) {
            (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}

pub fn extract_ec2_tags(tags: &[aws_sdk_ec2::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| t.key(), |t| t.value())
}

pub fn extract_rds_tags(tags: &[aws_sdk_rds::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| t.key(), |t| t.value())
}

pub fn extract_ecs_tags(tags: &[aws_sdk_ecs::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| t.key(), |t| t.value())
}

pub fn extract_elb_tags(
    tags: &[aws_sdk_elasticloadbalancingv2::types::Tag],
) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| t.value())
}

pub fn extract_s3_tags(tags: &[aws_sdk_s3::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| Some(t.value()))
}

pub fn extract_opensearch_tags(
    tags: &[aws_sdk_opensearch::types::Tag],
) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| Some(t.value()))
}

pub fn extract_workspaces_tags(
    tags: &[aws_sdk_workspaces::types::Tag],
) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| t.value())
}

/// Resource name from the `Name` tag, falling back to the id.
pub fn name_from_tags(tags: &HashMap<String, String>, id: &str) -> String {
    tags.get(TAG_NAME).cloned().unwrap_or_else(|| id.to_string())
}

/// Creation time from the `curfew:created-at` tag, if present and parsable.
pub fn created_at_from_tags(tags: &HashMap<String, String>) -> Option<DateTime<Utc>> {
    tags.get(TAG_CREATED_AT)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Marker-tag value for the sweep date
pub fn format_swept_at(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

/// Marker-tag value describing why the resource was swept
pub fn sweep_reason(age_days: i64) -> String {
    format!("idle-for-{age_days}-days")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn name_falls_back_to_id() {
        let mut tags = HashMap::new();
        assert_eq!(name_from_tags(&tags, "i-0abc"), "i-0abc");
        tags.insert(TAG_NAME.to_string(), "builder".to_string());
        assert_eq!(name_from_tags(&tags, "i-0abc"), "builder");
    }

    #[test]
    fn created_at_tag_parses_rfc3339() {
        let mut tags = HashMap::new();
        tags.insert(
            TAG_CREATED_AT.to_string(),
            "2024-05-01T12:00:00Z".to_string(),
        );
        let parsed = created_at_from_tags(&tags).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn unparsable_created_at_tag_is_none() {
        let mut tags = HashMap::new();
        tags.insert(TAG_CREATED_AT.to_string(), "last tuesday".to_string());
        assert!(created_at_from_tags(&tags).is_none());
        assert!(created_at_from_tags(&HashMap::new()).is_none());
    }

    #[test]
    fn marker_values() {
        let when = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        assert_eq!(format_swept_at(when), "2024-06-01");
        assert_eq!(sweep_reason(5), "idle-for-5-days");
    }

    #[test]
    fn extract_skips_tags_without_key_or_value() {
        let tags = vec![
            aws_sdk_ec2::types::Tag::builder()
                .key("Name")
                .value("builder")
                .build(),
            aws_sdk_ec2::types::Tag::builder().key("orphan").build(),
        ];
        let map = extract_ec2_tags(&tags);
        assert_eq!(map.len(), 1);
        assert_eq!(map["Name"], "builder");
    }
}
