use async_trait::async_trait;
use loadcore::{Activity, ActivityContext, ActivityError, Payload};
use loadruntime::{ActivityMetadata, ArgumentDefinition};

pub const ECHO_ACTIVITY: &str = "echo";

/// Returns its string argument unchanged
pub struct EchoActivity;

impl EchoActivity {
    pub fn metadata() -> ActivityMetadata {
        ActivityMetadata {
            description: "Returns the input string".to_string(),
            arguments: vec![ArgumentDefinition::new("input", "String to echo back")],
        }
    }
}

#[async_trait]
impl Activity for EchoActivity {
    fn activity_type(&self) -> &str {
        ECHO_ACTIVITY
    }

    async fn execute(&self, ctx: ActivityContext) -> Result<Option<Payload>, ActivityError> {
        let input: String = ctx.arg(0)?;
        Ok(Some(Payload::from(input)))
    }
}
