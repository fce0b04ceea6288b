//! Event fingerprinting.
//!
//! A fingerprint is a stable, human-readable string identifying one
//! underlying condition: `{namespace}_{workload}_{normalized-message}`.
//! Textually distinct probe-failure messages (different ports, different pod
//! IPs, readiness vs liveness) collapse to a single fingerprint so they
//! dedup against each other.

/// Marks the start of the embedded probe URL in readiness/liveness messages.
const PROBE_URL_MARKER: &str = ": Get http://10.";

/// Builds the dedup fingerprint for an event.
///
/// The middle part is the first hyphen-delimited segment of the involved
/// object's name, which approximates the owning workload once pod-template
/// hash suffixes are stripped. Missing segments degrade to empty string
/// parts; this never panics on odd input.
#[must_use]
pub fn build(namespace: &str, name: &str, message: &str) -> String {
    let workload = name.split('-').next().unwrap_or_default();
    let normalized = normalize_message(message);
    format!("{namespace}_{workload}_{normalized}")
}

/// Normalizes a message for fingerprinting.
///
/// Probe-failure messages are truncated at the embedded probe URL, the
/// `Readiness`/`Liveness` prefix is generalized to `Liveness/Readiness`, and
/// spaces become underscores. Everything else passes through verbatim.
fn normalize_message(message: &str) -> String {
    if !message.starts_with("Readiness") && !message.starts_with("Liveness") {
        return message.to_string();
    }

    let head = message
        .find(PROBE_URL_MARKER)
        .map_or(message, |pos| &message[..pos]);

    // Word-wise so the rewritten "Liveness/Readiness" is never re-matched.
    head.split(' ')
        .map(|word| match word {
            "Readiness" | "Liveness" => "Liveness/Readiness",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod probe_message_tests {
        use super::*;

        #[test]
        fn readiness_and_liveness_collapse_to_same_fingerprint() {
            let readiness = build(
                "prod",
                "api-6c4f9-xk2p1",
                "Readiness probe failed: Get http://10.1.2.3:8080/healthz: dial tcp timeout",
            );
            let liveness = build(
                "prod",
                "api-7b8d2-mm4q9",
                "Liveness probe failed: Get http://10.9.8.7:9090/healthz: dial tcp timeout",
            );
            assert_eq!(readiness, liveness);
            assert_eq!(readiness, "prod_api_Liveness/Readiness_probe_failed");
        }

        #[test]
        fn probe_message_without_url_is_still_generalized() {
            let fp = build("prod", "api-1", "Liveness probe failed");
            assert_eq!(fp, "prod_api_Liveness/Readiness_probe_failed");
        }

        #[test]
        fn different_probe_paths_before_url_stay_distinct() {
            let a = build(
                "prod",
                "api-1",
                "Readiness probe errored: Get http://10.0.0.1:80/",
            );
            let b = build(
                "prod",
                "api-1",
                "Readiness probe failed: Get http://10.0.0.1:80/",
            );
            assert_ne!(a, b);
        }
    }

    mod plain_message_tests {
        use super::*;

        #[test]
        fn non_probe_message_passes_through_verbatim() {
            let fp = build(
                "kube-system",
                "scheduler-0",
                "No nodes are available that match all of the predicates",
            );
            assert_eq!(
                fp,
                "kube-system_scheduler_No nodes are available that match all of the predicates"
            );
        }

        #[test]
        fn name_without_hyphens_uses_whole_token() {
            let fp = build("default", "standalone", "wanted to free 100Mi");
            assert_eq!(fp, "default_standalone_wanted to free 100Mi");
        }

        #[test]
        fn message_without_spaces_is_untouched() {
            let fp = build("default", "job-1", "OOMKilled");
            assert_eq!(fp, "default_job_OOMKilled");
        }
    }

    mod degenerate_input_tests {
        use super::*;

        #[test]
        fn empty_name_and_message_do_not_panic() {
            assert_eq!(build("ns", "", ""), "ns__");
        }

        #[test]
        fn empty_namespace_is_an_empty_part() {
            assert_eq!(build("", "pod-1", "msg"), "_pod_msg");
        }
    }
}
