use super::PlatformInner;
use loadcore::duration::to_std_opt;
use loadcore::kitchen_sink::{
    execute_activity_action, ActivityCancellationType, ExecuteActivityAction, RetryPolicy,
};
use loadcore::{Activity, ActivityContext, ActivityError, ActionError, Payload, TimeoutKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF_COEFFICIENT: f64 = 2.0;
const DEFAULT_MAXIMUM_INTERVAL_FACTOR: u32 = 100;

/// Retry schedule with platform defaults filled in for zero values
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    coefficient: f64,
    maximum: Duration,
    maximum_attempts: Option<u32>,
    non_retryable: Vec<String>,
}

impl Backoff {
    fn new(policy: Option<&RetryPolicy>, attempt_cap: Option<u32>) -> Self {
        let policy = policy.cloned().unwrap_or_default();
        let initial = to_std_opt(policy.initial_interval.as_ref()).unwrap_or(DEFAULT_INITIAL_INTERVAL);
        let coefficient = if policy.backoff_coefficient >= 1.0 {
            policy.backoff_coefficient
        } else {
            DEFAULT_BACKOFF_COEFFICIENT
        };
        let maximum = to_std_opt(policy.maximum_interval.as_ref())
            .unwrap_or_else(|| initial.saturating_mul(DEFAULT_MAXIMUM_INTERVAL_FACTOR));
        let maximum_attempts = match u32::try_from(policy.maximum_attempts) {
            Ok(attempts) if attempts > 0 => Some(attempts),
            _ => attempt_cap,
        };
        Self {
            initial,
            coefficient,
            maximum,
            maximum_attempts,
            non_retryable: policy.non_retryable_error_types,
        }
    }

    /// Delay before the attempt after `attempt` (1-based)
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        if exponent == 0 {
            return self.initial.min(self.maximum);
        }
        let secs = self.initial.as_secs_f64() * self.coefficient.powi(exponent);
        if !secs.is_finite() || secs >= self.maximum.as_secs_f64() {
            self.maximum
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    fn should_retry(&self, attempt: u32, error: &ActivityError) -> bool {
        if error.is_non_retryable() {
            return false;
        }
        if self.non_retryable.iter().any(|t| t == error.error_type()) {
            return false;
        }
        self.maximum_attempts.map_or(true, |max| attempt < max)
    }
}

/// Execute an activity with its timeouts, retries and cancellation type.
pub(super) async fn execute(
    platform: &PlatformInner,
    workflow_id: String,
    activity_id: String,
    action: ExecuteActivityAction,
    scope: CancellationToken,
) -> Result<Option<Payload>, ActionError> {
    let activity = platform
        .activities
        .get(&action.activity_type)
        .ok_or_else(|| ActivityError::UnknownType(action.activity_type.clone()))?;

    let backoff = Backoff::new(action.retry_policy.as_ref(), platform.config.max_activity_attempts);
    let start_to_close = to_std_opt(action.start_to_close_timeout.as_ref());
    let deadline = to_std_opt(action.schedule_to_close_timeout.as_ref()).and_then(deadline_after);
    let cancellation_type = match &action.locality {
        Some(execute_activity_action::Locality::Remote(options)) => options.cancellation_type(),
        _ => ActivityCancellationType::TryCancel,
    };

    let mut attempt = 1;
    loop {
        let ctx = ActivityContext {
            activity_id: activity_id.clone(),
            activity_type: action.activity_type.clone(),
            workflow_id: workflow_id.clone(),
            attempt,
            args: action.arguments.clone(),
            cancellation: CancellationToken::new(),
        };

        let error = match run_attempt(
            Arc::clone(&activity),
            ctx,
            start_to_close,
            deadline,
            &scope,
            cancellation_type,
        )
        .await
        {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if error == ActivityError::Cancelled {
            return Err(ActionError::Cancelled);
        }
        if !backoff.should_retry(attempt, &error) {
            tracing::warn!(
                "Activity {} failed after {} attempt(s): {}",
                action.activity_type,
                attempt,
                error
            );
            return Err(error.into());
        }

        let delay = backoff.delay(attempt);
        if deadline.map_or(false, |d| deadline_after(delay).map_or(true, |at| at >= d)) {
            return Err(ActivityError::Timeout(TimeoutKind::ScheduleToClose).into());
        }
        tracing::debug!(
            "Activity {} attempt {} failed: {}; retrying in {:?}",
            action.activity_type,
            attempt,
            error,
            delay
        );
        tokio::select! {
            biased;
            _ = scope.cancelled() => return Err(ActionError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

async fn run_attempt(
    activity: Arc<dyn Activity>,
    ctx: ActivityContext,
    start_to_close: Option<Duration>,
    deadline: Option<Instant>,
    scope: &CancellationToken,
    cancellation_type: ActivityCancellationType,
) -> Result<Option<Payload>, ActivityError> {
    let token = ctx.cancellation.clone();
    let mut task = tokio::spawn(async move { activity.execute(ctx).await });

    tokio::select! {
        biased;

        _ = scope.cancelled() => {
            match cancellation_type {
                ActivityCancellationType::TryCancel => token.cancel(),
                ActivityCancellationType::WaitCancellationCompleted => {
                    token.cancel();
                    let _ = (&mut task).await;
                }
                ActivityCancellationType::Abandon => {}
            }
            Err(ActivityError::Cancelled)
        }

        joined = &mut task => {
            joined.unwrap_or_else(|e| Err(ActivityError::failed("ActivityPanic", e.to_string())))
        }

        _ = sleep_for(start_to_close) => {
            token.cancel();
            task.abort();
            Err(ActivityError::Timeout(TimeoutKind::StartToClose))
        }

        _ = sleep_until(deadline) => {
            token.cancel();
            task.abort();
            Err(ActivityError::Timeout(TimeoutKind::ScheduleToClose))
        }
    }
}

/// `None` when `after` lies beyond what the clock can represent.
fn deadline_after(after: Duration) -> Option<Instant> {
    Instant::now().checked_add(after)
}

async fn sleep_for(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => futures::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
