use crate::model::{bounded_text, Identified, ModelError};
use serde::{Deserialize, Serialize};

/// One user subscribed to one notification topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: Option<String>,
    pub topic: String,
    pub user: String,
}

impl Subscription {
    pub const MAX_LEN: usize = 200;

    pub fn new(topic: &str, user: &str) -> Result<Self, ModelError> {
        Ok(Self {
            id: None,
            topic: bounded_text("topic", topic, Self::MAX_LEN)?,
            user: bounded_text("user", user, Self::MAX_LEN)?,
        })
    }
}

impl Identified for Subscription {
    fn compute_identity(&self) -> String {
        format!("{}#{}", self.topic, self.user)
    }

    fn identity(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_identity(&mut self, id: String) {
        self.id = Some(id);
    }
}
