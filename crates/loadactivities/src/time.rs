use async_trait::async_trait;
use loadcore::{Activity, ActivityContext, ActivityError, Payload};
use loadruntime::{ActivityMetadata, ArgumentDefinition};
use tokio::time::{sleep, Duration};

pub const DELAY_ACTIVITY: &str = "delay";

/// Sleep for the number of milliseconds given as the first argument
pub struct DelayActivity;

impl DelayActivity {
    pub fn metadata() -> ActivityMetadata {
        ActivityMetadata {
            description: "Sleeps for the given number of milliseconds".to_string(),
            arguments: vec![ArgumentDefinition::new("milliseconds", "How long to sleep")],
        }
    }
}

#[async_trait]
impl Activity for DelayActivity {
    fn activity_type(&self) -> &str {
        DELAY_ACTIVITY
    }

    async fn execute(&self, ctx: ActivityContext) -> Result<Option<Payload>, ActivityError> {
        let delay_ms: u64 = ctx.arg(0)?;
        tracing::debug!("Delaying for {}ms", delay_ms);

        tokio::select! {
            _ = ctx.cancellation.cancelled() => {
                tracing::debug!("Delay cancelled");
                Err(ActivityError::Cancelled)
            }
            _ = sleep(Duration::from_millis(delay_ms)) => Ok(None),
        }
    }
}
