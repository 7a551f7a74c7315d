use std::{sync::Mutex, time::Duration};

use reqwest::header::HeaderMap;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
	pub remaining: Option<u64>,
	/// Unix timestamp, in seconds, at which the quota window resets.
	pub reset_at: Option<i64>,
}

/// Tracks the hosting API quota reported on every response and holds requests back while the
/// quota sits below the safety threshold.
///
/// Waits never exceed `max_wait`; once a wait completes the low-quota state is cleared so callers
/// proceed and degrade through ordinary request failures instead of stalling.
#[derive(Debug)]
pub struct RateLimiter {
	safety_threshold: u64,
	max_wait: Duration,
	state: Mutex<QuotaState>,
}
impl RateLimiter {
	pub fn new(cfg: &coderef_config::RateLimit) -> Self {
		Self {
			safety_threshold: cfg.safety_threshold,
			max_wait: Duration::from_secs(cfg.max_wait_secs),
			state: Mutex::new(QuotaState::default()),
		}
	}

	pub fn observe(&self, headers: &HeaderMap) {
		let remaining = header_number::<u64>(headers, REMAINING_HEADER);
		let reset_at = header_number::<i64>(headers, RESET_HEADER);

		if remaining.is_none() && reset_at.is_none() {
			return;
		}

		self.record(remaining, reset_at);
	}

	pub fn record(&self, remaining: Option<u64>, reset_at: Option<i64>) {
		let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

		if remaining.is_some() {
			state.remaining = remaining;
		}
		if reset_at.is_some() {
			state.reset_at = reset_at;
		}
	}

	pub fn snapshot(&self) -> QuotaState {
		*self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	/// Sleeps until the quota resets when it is running low. Returns how long it waited.
	pub async fn throttle(&self) -> Option<Duration> {
		let now = time::OffsetDateTime::now_utc().unix_timestamp();
		let state = self.snapshot();
		let delay = backoff_delay(state, self.safety_threshold, self.max_wait, now)?;

		tracing::warn!(
			remaining = state.remaining,
			reset_at = state.reset_at,
			wait_secs = delay.as_secs(),
			"Rate limit low; waiting for quota reset."
		);

		tokio::time::sleep(delay).await;

		let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

		state.remaining = None;

		Some(delay)
	}
}

/// Delay before the next request, or `None` when the request may proceed immediately.
pub fn backoff_delay(
	state: QuotaState,
	safety_threshold: u64,
	max_wait: Duration,
	now: i64,
) -> Option<Duration> {
	let remaining = state.remaining?;

	if remaining >= safety_threshold {
		return None;
	}

	let until_reset = state.reset_at?.saturating_sub(now);

	if until_reset <= 0 {
		return None;
	}

	Some(Duration::from_secs(until_reset as u64).min(max_wait))
}

fn header_number<T>(headers: &HeaderMap, name: &str) -> Option<T>
where
	T: std::str::FromStr,
{
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
