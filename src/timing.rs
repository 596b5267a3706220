//! Central timing knobs (SPEC_FULL.md §9): every fixed delay the Session
//! Manager and keystroke policy use lives on one config object rather than
//! as constants sprinkled through call sites, so tests can zero them out.

use std::time::Duration;

/// Upper-bound delays used to synchronize with the assistant's terminal UI.
/// Tests construct a [`Timing::zeroed`] instance so scenario assertions
/// don't actually sleep.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Delay before the trust-dialog auto-confirmation keystroke fires.
    pub trust_prompt_delay: Duration,
    /// Poll interval while waiting for the assistant to become ready.
    pub readiness_poll_interval: Duration,
    /// Deadline after which readiness detection gives up and proceeds anyway.
    pub readiness_deadline: Duration,
    /// Settle delay after readiness is detected, before the first injection.
    pub readiness_settle: Duration,
    /// Gap between `Down` keystrokes when selecting an option.
    pub down_key_gap: Duration,
    /// Wait after `Tab` before the amendment input box accepts text.
    pub amendment_open_delay: Duration,
    /// Wait after sending amendment instructions, before `Enter`.
    pub amendment_submit_delay: Duration,
    /// Gap between the two `Enter` presses that follow free-text/file sends.
    pub double_enter_gap: Duration,
    /// Pause between sending successive attachments.
    pub attachment_gap: Duration,
    /// Delay before removing the "eyes" reaction after a plain rejection.
    pub rejection_reaction_delay: Duration,
    /// Idle sweep period.
    pub idle_sweep_interval: Duration,
    /// Crash sweep period.
    pub crash_sweep_interval: Duration,
    /// Temp cleanup sweep period.
    pub temp_cleanup_interval: Duration,
    /// Download timeout for attachment fetches.
    pub download_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            trust_prompt_delay: Duration::from_secs(2),
            readiness_poll_interval: Duration::from_millis(300),
            readiness_deadline: Duration::from_secs(15),
            readiness_settle: Duration::from_millis(200),
            down_key_gap: Duration::from_millis(100),
            amendment_open_delay: Duration::from_millis(500),
            amendment_submit_delay: Duration::from_millis(500),
            double_enter_gap: Duration::from_millis(100),
            attachment_gap: Duration::from_secs(1),
            rejection_reaction_delay: Duration::from_millis(1500),
            idle_sweep_interval: Duration::from_secs(60),
            crash_sweep_interval: Duration::from_secs(30),
            temp_cleanup_interval: Duration::from_secs(24 * 60 * 60),
            download_timeout: Duration::from_secs(30),
        }
    }
}

impl Timing {
    /// All delays zeroed out — for tests that assert ordering/content but
    /// don't want to actually wait.
    pub fn zeroed() -> Self {
        Self {
            trust_prompt_delay: Duration::ZERO,
            readiness_poll_interval: Duration::from_millis(1),
            readiness_deadline: Duration::from_millis(20),
            readiness_settle: Duration::ZERO,
            down_key_gap: Duration::ZERO,
            amendment_open_delay: Duration::ZERO,
            amendment_submit_delay: Duration::ZERO,
            double_enter_gap: Duration::ZERO,
            attachment_gap: Duration::ZERO,
            rejection_reaction_delay: Duration::ZERO,
            idle_sweep_interval: Duration::from_millis(10),
            crash_sweep_interval: Duration::from_millis(10),
            temp_cleanup_interval: Duration::from_millis(10),
            download_timeout: Duration::from_secs(5),
        }
    }
}
