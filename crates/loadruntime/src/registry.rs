use loadcore::Activity;
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata about an activity type
#[derive(Debug, Clone, Default)]
pub struct ActivityMetadata {
    pub description: String,
    /// Positional arguments, in order
    pub arguments: Vec<ArgumentDefinition>,
}

#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub description: String,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

struct Registration {
    activity: Arc<dyn Activity>,
    metadata: ActivityMetadata,
}

/// Activities a worker can execute, keyed by activity type
#[derive(Default)]
pub struct ActivityRegistry {
    activities: HashMap<String, Registration>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an activity; a later registration of the same type wins
    pub fn register(&mut self, activity: Arc<dyn Activity>) {
        self.register_with_metadata(activity, ActivityMetadata::default());
    }

    pub fn register_with_metadata(&mut self, activity: Arc<dyn Activity>, metadata: ActivityMetadata) {
        let activity_type = activity.activity_type().to_string();
        tracing::info!("Registering activity type: {}", activity_type);
        if self
            .activities
            .insert(activity_type.clone(), Registration { activity, metadata })
            .is_some()
        {
            tracing::warn!("Activity type {} was already registered; replaced", activity_type);
        }
    }

    pub fn get(&self, activity_type: &str) -> Option<Arc<dyn Activity>> {
        self.activities
            .get(activity_type)
            .map(|r| Arc::clone(&r.activity))
    }

    /// Registered activity types, sorted
    pub fn list_activity_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.activities.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, activity_type: &str) -> Option<ActivityMetadata> {
        self.activities.get(activity_type).map(|r| r.metadata.clone())
    }
}
