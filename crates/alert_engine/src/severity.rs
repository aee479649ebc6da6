//! Maps the feed's CAP severity/certainty pair onto the three-level
//! domain severity.

use common::AlertSeverity;

/// Ordered rules, first match wins:
/// 1. `Extreme` or `Severe` → Warning, whatever the certainty.
/// 2. `Moderate` unless certainty is `Unlikely` → Watch.
/// 3. Anything else, including unknown vocabulary → Advisory.
pub fn classify(severity: &str, certainty: &str) -> AlertSeverity {
    match severity {
        "Extreme" | "Severe" => AlertSeverity::Warning,
        "Moderate" if certainty != "Unlikely" => AlertSeverity::Watch,
        _ => AlertSeverity::Advisory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extreme_and_severe_are_warnings_regardless_of_certainty() {
        for sev in ["Extreme", "Severe"] {
            for cert in ["Observed", "Likely", "Possible", "Unlikely", "Unknown", ""] {
                assert_eq!(classify(sev, cert), AlertSeverity::Warning, "{sev}/{cert}");
            }
        }
    }

    #[test]
    fn test_moderate_is_watch_unless_unlikely() {
        assert_eq!(classify("Moderate", "Likely"), AlertSeverity::Watch);
        assert_eq!(classify("Moderate", "Possible"), AlertSeverity::Watch);
        assert_eq!(classify("Moderate", ""), AlertSeverity::Watch);
        assert_eq!(classify("Moderate", "Unlikely"), AlertSeverity::Advisory);
    }

    #[test]
    fn test_minor_and_unknown_fall_through_to_advisory() {
        assert_eq!(classify("Minor", "Observed"), AlertSeverity::Advisory);
        assert_eq!(classify("Unknown", "Likely"), AlertSeverity::Advisory);
        assert_eq!(classify("", ""), AlertSeverity::Advisory);
        // Matching is exact; the feed capitalizes its vocabulary.
        assert_eq!(classify("severe", "Observed"), AlertSeverity::Advisory);
    }
}
