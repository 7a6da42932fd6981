// Placeholder tools. Replace these with tools generated from your API description.

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_any_object, json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Echo-style example tool
pub struct ExampleTool;

#[derive(Debug, Deserialize)]
struct ExampleToolArgs {
    query: String,
}

#[async_trait::async_trait]
impl Tool for ExampleTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "example_tool".to_string(),
            description: "Example tool - replace with OpenAPI-generated tools".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "query": json_schema_string("Example query parameter")
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ExampleToolArgs =
            serde_json::from_value(arguments).context("Invalid arguments for example_tool")?;

        Ok(CallToolResult::text(format!(
            "Example tool executed with query: {}",
            args.query
        )))
    }
}

/// Stand-in for a GET endpoint of a wrapped API
pub struct ExampleGetRequestTool;

#[derive(Debug, Deserialize)]
struct GetRequestArgs {
    resource_id: String,
}

#[async_trait::async_trait]
impl Tool for ExampleGetRequestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "example_get_request".to_string(),
            description: "Example GET request - customize for your API".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "resource_id": json_schema_string("ID of the resource to fetch")
                }),
                vec!["resource_id"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GetRequestArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for example_get_request")?;

        Ok(CallToolResult::text(format!(
            "Fetched resource {} from your API",
            args.resource_id
        )))
    }
}

/// Stand-in for a POST endpoint of a wrapped API
pub struct ExamplePostRequestTool;

#[derive(Debug, Deserialize)]
struct PostRequestArgs {
    data: serde_json::Map<String, serde_json::Value>,
}

#[async_trait::async_trait]
impl Tool for ExamplePostRequestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "example_post_request".to_string(),
            description: "Example POST request - customize for your API".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "data": json_schema_any_object("Data to send in the request body")
                }),
                vec!["data"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: PostRequestArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for example_post_request")?;

        Ok(CallToolResult::text(format!(
            "Created resource with data: {}",
            serde_json::Value::Object(args.data)
        )))
    }
}
