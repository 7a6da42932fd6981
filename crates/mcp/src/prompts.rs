// Prompt templates exposed to the client

use crate::protocol::{Content, GetPromptResult, PromptArgument, PromptDescriptor, PromptMessage, Role};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait Prompt: Send + Sync {
    fn descriptor(&self) -> PromptDescriptor;

    /// Render the prompt with the caller's arguments
    async fn get(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult>;
}

#[derive(Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Arc<dyn Prompt>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prompt: Arc<dyn Prompt>) {
        let name = prompt.descriptor().name;
        self.prompts.insert(name, prompt);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Prompt>> {
        self.prompts.get(name).cloned()
    }

    pub fn list(&self) -> Vec<PromptDescriptor> {
        let mut list: Vec<_> = self.prompts.values().map(|p| p.descriptor()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

pub struct ExamplePrompt;

const DEFAULT_TOPIC: &str = "general topic";

#[async_trait::async_trait]
impl Prompt for ExamplePrompt {
    fn descriptor(&self) -> PromptDescriptor {
        PromptDescriptor {
            name: "example_prompt".to_string(),
            description: Some("Example prompt template".to_string()),
            arguments: vec![PromptArgument {
                name: "topic".to_string(),
                description: Some("Topic to generate prompt for".to_string()),
                required: true,
            }],
        }
    }

    async fn get(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let topic = arguments
            .get("topic")
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC);

        Ok(GetPromptResult {
            description: Some("Example prompt template".to_string()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text(format!("Please provide information about {}", topic)),
            }],
        })
    }
}
