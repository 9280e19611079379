//! Skip reason tracking for fallback chain diagnostics.

use crate::models::ProviderId;

/// Why a provider in a chain was passed over without a completed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Chain names a provider that was never registered.
    NotRegistered,

    /// Provider doesn't declare the capability being resolved.
    CapabilityNotDeclared,

    /// Scheduler refused the request (queue full, unknown provider, stopped).
    Denied { reason: String },
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub skipped: Option<SkipReason>,
    pub error: Option<String>,
    pub success: bool,
}

/// Per-provider trail of one routed fetch.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, provider_id: ProviderId, error: String) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            error: Some(error),
            success: false,
        });
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.provider_id)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({:?})", a.provider_id, skip)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({})", a.provider_id, err)
                } else {
                    format!("{}: UNKNOWN", a.provider_id)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    /// Providers that were actually called, in order.
    pub fn attempted(&self) -> Vec<&ProviderId> {
        self.attempts
            .iter()
            .filter(|a| a.skipped.is_none())
            .map(|a| &a.provider_id)
            .collect()
    }

    pub fn errors(&self) -> Vec<(&ProviderId, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_ref().map(|e| (&a.provider_id, e.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = FetchDiagnostics::new();
        diag.record_skip(
            Cow::Borrowed("FINNHUB"),
            SkipReason::Denied {
                reason: "queue full".to_string(),
            },
        );
        diag.record_error(Cow::Borrowed("ALPHA_VANTAGE"), "Timeout".to_string());
        diag.record_success(Cow::Borrowed("YAHOO"));

        assert_eq!(
            diag.summary(),
            "FINNHUB: SKIPPED (Denied { reason: \"queue full\" }) -> ALPHA_VANTAGE: ERROR (Timeout) -> YAHOO: SUCCESS"
        );
    }

    #[test]
    fn test_has_success() {
        let mut diag = FetchDiagnostics::new();
        diag.record_skip(Cow::Borrowed("YAHOO"), SkipReason::NotRegistered);
        assert!(!diag.has_success());

        diag.record_success(Cow::Borrowed("COINGECKO"));
        assert!(diag.has_success());
    }

    #[test]
    fn test_attempted_excludes_skips() {
        let mut diag = FetchDiagnostics::new();
        diag.record_skip(Cow::Borrowed("A"), SkipReason::CapabilityNotDeclared);
        diag.record_error(Cow::Borrowed("B"), "boom".to_string());
        diag.record_success(Cow::Borrowed("C"));

        let attempted: Vec<&str> = diag.attempted().into_iter().map(|p| p.as_ref()).collect();
        assert_eq!(attempted, vec!["B", "C"]);
        assert_eq!(diag.errors().len(), 1);
    }
}
