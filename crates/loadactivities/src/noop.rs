use async_trait::async_trait;
use loadcore::{Activity, ActivityContext, ActivityError, Payload};
use loadruntime::ActivityMetadata;

pub const NOOP_ACTIVITY: &str = "noop";

pub struct NoopActivity;

impl NoopActivity {
    pub fn metadata() -> ActivityMetadata {
        ActivityMetadata {
            description: "Does nothing".to_string(),
            arguments: vec![],
        }
    }
}

#[async_trait]
impl Activity for NoopActivity {
    fn activity_type(&self) -> &str {
        NOOP_ACTIVITY
    }

    async fn execute(&self, _ctx: ActivityContext) -> Result<Option<Payload>, ActivityError> {
        Ok(None)
    }
}
