/// Classification for retry policy.
///
/// Used by the scheduler to decide whether a failed attempt is retried and whether the
/// provider's adaptive throttle is engaged. The fallback router advances to the next
/// provider on every class once the scheduler gives up.
///
/// # Behavior Summary
///
/// | Class | Retried by scheduler? | Throttle applied? |
/// |-------|-----------------------|-------------------|
/// | `Never` | No | No |
/// | `FailoverWithPenalty` | Yes, with backoff | Yes |
/// | `NextProvider` | Yes, with backoff | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad symbol, validation error, or terminal failure.
    /// Retrying the same provider won't help, but another provider might.
    Never,

    /// Transient failure caused by the provider pushing back (429/403 quota).
    ///
    /// The attempt is recorded as rate limited, which extends the provider's adaptive
    /// throttle, and then retried with exponential backoff.
    FailoverWithPenalty,

    /// Transient failure (timeout, 5xx, malformed payload) with no throttle penalty.
    NextProvider,
}
