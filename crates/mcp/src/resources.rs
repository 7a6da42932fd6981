// Resources exposed to the client, keyed by URI

use crate::protocol::{ReadResourceResult, ResourceContents, ResourceDescriptor};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    fn descriptor(&self) -> ResourceDescriptor;

    /// Read the resource; `uri` is the one the client asked for
    async fn read(&self, uri: &str) -> Result<ReadResourceResult>;
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        let uri = resource.descriptor().uri;
        self.resources.insert(uri, resource);
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(uri).cloned()
    }

    /// Descriptors ordered by URI
    pub fn list(&self) -> Vec<ResourceDescriptor> {
        let mut list: Vec<_> = self.resources.values().map(|r| r.descriptor()).collect();
        list.sort_by(|a, b| a.uri.cmp(&b.uri));
        list
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Placeholder resource; replace with your own
pub struct ExampleResource;

impl ExampleResource {
    pub const URI: &'static str = "example://resource";
}

#[async_trait::async_trait]
impl Resource for ExampleResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: Self::URI.to_string(),
            name: "Example Resource".to_string(),
            description: Some("Example resource - replace with your resources".to_string()),
            mime_type: Some("text/plain".to_string()),
        }
    }

    async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: "Example resource content".to_string(),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_example_resource() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(ExampleResource));

        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uri, "example://resource");
        assert_eq!(listed[0].mime_type.as_deref(), Some("text/plain"));

        let resource = registry.get("example://resource").unwrap();
        let result = resource.read("example://resource").await.unwrap();
        assert_eq!(result.contents[0].text, "Example resource content");
        assert_eq!(result.contents[0].uri, "example://resource");

        assert!(registry.get("example://other").is_none());
    }
}
