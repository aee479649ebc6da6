//! Raw feed records → internal `Alert`s.

use chrono::{DateTime, Utc};
use common::{Alert, ALERT_SOURCE};
use nws_client::AlertFeature;
use tracing::debug;

use crate::severity::classify;

fn parse_instant(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Only confirmed real-world messages are kept; drafts, exercises and
/// tests are not alerts.
fn is_actual(feature: &AlertFeature) -> bool {
    feature
        .properties
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("actual"))
}

/// Convert a single record, or `None` if it is unusable.
///
/// A record without an id, with a missing or unparseable `effective` /
/// `expires`, or whose end precedes its start is dropped. `is_active` is
/// computed against `now` once here.
pub fn normalize_record(
    feature: &AlertFeature,
    location_id: &str,
    now: DateTime<Utc>,
) -> Option<Alert> {
    let props = &feature.properties;

    let Some(id) = feature.alert_id() else {
        debug!("{}: dropping alert record without id", location_id);
        return None;
    };

    let (Some(start_time), Some(end_time)) = (
        parse_instant(props.effective.as_deref()),
        parse_instant(props.expires.as_deref()),
    ) else {
        debug!("{}: dropping alert {} with malformed timestamps", location_id, id);
        return None;
    };

    if end_time < start_time {
        debug!("{}: dropping alert {} that ends before it starts", location_id, id);
        return None;
    }

    let severity = classify(
        props.severity.as_deref().unwrap_or_default(),
        props.certainty.as_deref().unwrap_or_default(),
    );

    let headline = props
        .headline
        .clone()
        .or_else(|| props.event.clone())
        .unwrap_or_default();

    Some(Alert {
        id: id.to_string(),
        location_id: location_id.to_string(),
        severity,
        headline,
        description: props.description.clone().unwrap_or_default(),
        start_time,
        end_time,
        source: ALERT_SOURCE.to_string(),
        is_active: now < end_time,
    })
}

/// Normalize a feed batch, keeping feed order and only active alerts.
pub fn normalize(features: &[AlertFeature], location_id: &str, now: DateTime<Utc>) -> Vec<Alert> {
    features
        .iter()
        .filter(|f| is_actual(f))
        .filter_map(|f| normalize_record(f, location_id, now))
        .filter(|a| a.is_active)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::AlertSeverity;
    use nws_client::AlertProperties;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap()
    }

    fn feature(id: &str, severity: &str, certainty: &str) -> AlertFeature {
        AlertFeature {
            id: Some(format!("https://api.weather.gov/alerts/{id}")),
            properties: AlertProperties {
                id: Some(id.to_string()),
                status: Some("Actual".into()),
                severity: Some(severity.into()),
                certainty: Some(certainty.into()),
                event: Some("Flood Watch".into()),
                headline: Some(format!("Headline {id}")),
                description: Some("Details".into()),
                effective: Some("2026-06-01T19:00:00Z".into()),
                expires: Some("2026-06-01T23:00:00Z".into()),
                ..AlertProperties::default()
            },
        }
    }

    #[test]
    fn test_mixed_severities_keep_feed_order() {
        let batch = vec![
            feature("a", "Severe", "Observed"),
            feature("b", "Moderate", "Likely"),
            feature("c", "Minor", "Possible"),
        ];
        let alerts = normalize(&batch, "loc-1", fixed_now());
        let severities: Vec<_> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(
            severities,
            vec![AlertSeverity::Warning, AlertSeverity::Watch, AlertSeverity::Advisory]
        );
        let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(alerts.iter().all(|a| a.location_id == "loc-1"));
        assert!(alerts.iter().all(|a| a.source == ALERT_SOURCE));
    }

    #[test]
    fn test_expired_record_is_inactive_and_excluded() {
        let mut expired = feature("old", "Severe", "Observed");
        expired.properties.effective = Some("2026-06-01T10:00:00Z".into());
        expired.properties.expires = Some("2026-06-01T12:00:00Z".into());

        let alert = normalize_record(&expired, "loc-1", fixed_now()).expect("record is valid");
        assert!(!alert.is_active);

        assert!(normalize(&[expired], "loc-1", fixed_now()).is_empty());
    }

    #[test]
    fn test_expiry_exactly_now_is_not_active() {
        let mut ending = feature("edge", "Severe", "Observed");
        ending.properties.expires = Some("2026-06-01T20:00:00Z".into());
        let alert = normalize_record(&ending, "loc-1", fixed_now()).expect("record is valid");
        assert!(!alert.is_active);
    }

    #[test]
    fn test_non_actual_status_is_dropped() {
        let mut test_msg = feature("t", "Extreme", "Observed");
        test_msg.properties.status = Some("Test".into());
        let mut draft = feature("d", "Extreme", "Observed");
        draft.properties.status = Some("Draft".into());
        let mut missing = feature("m", "Extreme", "Observed");
        missing.properties.status = None;

        let kept = normalize(
            &[test_msg, draft, missing, feature("ok", "Extreme", "Observed")],
            "loc-1",
            fixed_now(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "ok");
    }

    #[test]
    fn test_malformed_timestamp_drops_only_that_record() {
        let mut bad = feature("bad", "Severe", "Observed");
        bad.properties.expires = Some("tomorrow-ish".into());
        let mut missing = feature("missing", "Severe", "Observed");
        missing.properties.effective = None;

        let kept = normalize(
            &[feature("first", "Minor", "Observed"), bad, missing, feature("last", "Severe", "Likely")],
            "loc-1",
            fixed_now(),
        );
        let ids: Vec<_> = kept.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "last"]);
    }

    #[test]
    fn test_end_before_start_is_dropped() {
        let mut inverted = feature("inv", "Severe", "Observed");
        inverted.properties.effective = Some("2026-06-02T00:00:00Z".into());
        inverted.properties.expires = Some("2026-06-01T23:00:00Z".into());
        assert!(normalize_record(&inverted, "loc-1", fixed_now()).is_none());
    }

    #[test]
    fn test_offset_timestamps_convert_to_utc() {
        let mut offset = feature("tz", "Moderate", "Possible");
        offset.properties.effective = Some("2026-06-01T15:00:00-04:00".into());
        offset.properties.expires = Some("2026-06-01T21:00:00-04:00".into());
        let alert = normalize_record(&offset, "loc-1", fixed_now()).expect("valid offsets");
        assert_eq!(alert.start_time, Utc.with_ymd_and_hms(2026, 6, 1, 19, 0, 0).unwrap());
        assert_eq!(alert.end_time, Utc.with_ymd_and_hms(2026, 6, 2, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_headline_falls_back_to_event() {
        let mut bare = feature("bare", "Minor", "Observed");
        bare.properties.headline = None;
        let alert = normalize_record(&bare, "loc-1", fixed_now()).expect("valid record");
        assert_eq!(alert.headline, "Flood Watch");
    }
}
