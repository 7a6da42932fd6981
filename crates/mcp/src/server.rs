// MCP request dispatcher, shared by the stdio and HTTP transports

use crate::error::{McpError, McpResult};
use crate::logging::LogLevelSink;
use crate::prompts::{ExamplePrompt, PromptRegistry};
use crate::protocol::*;
use crate::resources::{ExampleResource, ResourceRegistry};
use crate::tools::{ExampleGetRequestTool, ExamplePostRequestTool, ExampleTool, ToolRegistry};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Identity and optional capabilities of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
    pub resources_enabled: bool,
    pub prompts_enabled: bool,
}

impl ServerOptions {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            resources_enabled: true,
            prompts_enabled: true,
        }
    }
}

pub struct McpServer {
    options: ServerOptions,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    log_sink: Option<Arc<dyn LogLevelSink>>,
}

impl McpServer {
    pub fn new(options: ServerOptions, tools: ToolRegistry) -> Self {
        Self {
            options,
            tools,
            resources: ResourceRegistry::new(),
            prompts: PromptRegistry::new(),
            log_sink: None,
        }
    }

    /// Server pre-loaded with the placeholder tools, resource and prompt
    pub fn with_examples(options: ServerOptions) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(ExampleTool));
        tools.register(Arc::new(ExampleGetRequestTool));
        tools.register(Arc::new(ExamplePostRequestTool));

        let mut resources = ResourceRegistry::new();
        if options.resources_enabled {
            resources.register(Arc::new(ExampleResource));
        }

        let mut prompts = PromptRegistry::new();
        if options.prompts_enabled {
            prompts.register(Arc::new(ExamplePrompt));
        }

        Self::new(options, tools)
            .with_resources(resources)
            .with_prompts(prompts)
    }

    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogLevelSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(ListChangedCapability::default()),
            resources: self
                .options
                .resources_enabled
                .then(ResourcesCapability::default),
            prompts: self
                .options
                .prompts_enabled
                .then(ListChangedCapability::default),
            logging: Some(json!({})),
        }
    }

    /// Handle one raw frame. Returns `None` when nothing should be sent back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                tracing::warn!("Discarding unparseable message: {}", e);
                Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
            }
        }
    }

    /// Handle an already-parsed JSON value
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        if value.get("method").is_none() {
            if value.get("result").is_some() || value.get("error").is_some() {
                // Response to a server-initiated request; we never send any
                tracing::debug!("Ignoring client response for id {}", id);
                return None;
            }
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()))
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request
                .id
                .map(|id| JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        tracing::debug!(method = %request.method, "Handling request");
        match self.dispatch(&request.method, request.params).await {
            Ok(result) => Some(JsonRpcResponse::success(id, result)),
            Err(err) => {
                tracing::error!("Request {} failed: {}", request.method, err);
                Some(JsonRpcResponse::error(id, err.into()))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            other => tracing::debug!("Ignoring notification {}", other),
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        match method {
            "initialize" => self.initialize(parse_params(params)?),
            "ping" => Ok(json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.tools.list_schemas(),
            }),
            "tools/call" => self.call_tool(parse_params(params)?).await,
            "resources/list" if self.options.resources_enabled => to_value(ListResourcesResult {
                resources: self.resources.list(),
            }),
            "resources/read" if self.options.resources_enabled => {
                self.read_resource(parse_params(params)?).await
            }
            "prompts/list" if self.options.prompts_enabled => to_value(ListPromptsResult {
                prompts: self.prompts.list(),
            }),
            "prompts/get" if self.options.prompts_enabled => {
                self.get_prompt(parse_params(params)?).await
            }
            "logging/setLevel" => self.set_level(parse_params(params)?),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, params: InitializeParams) -> McpResult<Value> {
        tracing::info!(
            "Initializing session for {} {} (protocol {})",
            params.client_info.name,
            params.client_info.version,
            params.protocol_version
        );

        to_value(InitializeResult {
            protocol_version: negotiate_protocol_version(Some(&params.protocol_version))
                .to_string(),
            capabilities: self.capabilities(),
            server_info: Implementation {
                name: self.options.name.clone(),
                version: self.options.version.clone(),
            },
            instructions: self.options.instructions.clone(),
        })
    }

    async fn call_tool(&self, params: CallToolParams) -> McpResult<Value> {
        tracing::info!("Calling tool: {}", params.name);

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| McpError::UnknownTool(params.name.clone()))?;

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Tool {} failed: {:#}", params.name, e);
                CallToolResult::error(format!("{:#}", e))
            }
        };

        to_value(result)
    }

    async fn read_resource(&self, params: ReadResourceParams) -> McpResult<Value> {
        tracing::info!("Reading resource: {}", params.uri);

        let resource = self
            .resources
            .get(&params.uri)
            .ok_or_else(|| McpError::UnknownResource(params.uri.clone()))?;

        to_value(resource.read(&params.uri).await?)
    }

    async fn get_prompt(&self, params: GetPromptParams) -> McpResult<Value> {
        tracing::info!("Getting prompt: {}", params.name);

        let prompt = self
            .prompts
            .get(&params.name)
            .ok_or_else(|| McpError::UnknownPrompt(params.name.clone()))?;

        to_value(prompt.get(&params.arguments).await?)
    }

    fn set_level(&self, params: SetLevelParams) -> McpResult<Value> {
        match &self.log_sink {
            Some(sink) => sink.set_level(params.level)?,
            None => tracing::debug!("No log control installed, ignoring level {:?}", params.level),
        }
        Ok(json!({}))
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_value(result: impl serde::Serialize) -> McpResult<Value> {
    serde_json::to_value(result).map_err(|e| McpError::Handler(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn server() -> McpServer {
        McpServer::with_examples(ServerOptions::new("test-server", "0.1.0"))
    }

    async fn call(server: &McpServer, method: &str, params: Value) -> JsonRpcResponse {
        server
            .handle_request(JsonRpcRequest::new(1, method, params))
            .await
            .expect("requests with an id get a response")
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server();
        let response = call(
            &server,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert!(result["capabilities"]["resources"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
        assert!(result["capabilities"]["logging"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let response = server
            .handle_request(JsonRpcRequest::notification("notifications/initialized"))
            .await;
        assert!(response.is_none());

        let response = server
            .handle_request(JsonRpcRequest::notification("does/not/exist"))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let response = call(&server(), "ping", json!({})).await;
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_list_and_call_tools() {
        let server = server();
        let response = call(&server, "tools/list", json!({})).await;
        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["example_get_request", "example_post_request", "example_tool"]);
        assert_eq!(tools[2]["inputSchema"]["required"], json!(["query"]));

        let response = call(
            &server,
            "tools/call",
            json!({"name": "example_tool", "arguments": {"query": "hello"}}),
        )
        .await;
        assert_eq!(
            response.result.unwrap(),
            json!({"content": [{"type": "text", "text": "Example tool executed with query: hello"}]})
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let response = call(&server(), "tools/call", json!({"name": "nope", "arguments": {}})).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INTERNAL_ERROR);
        assert_eq!(error.message, "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_in_result() {
        let response = call(&server(), "tools/call", json!({"name": "example_tool"})).await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: Invalid arguments for example_tool"));
    }

    #[tokio::test]
    async fn test_missing_params_are_invalid() {
        let response = call(&server(), "tools/call", json!({"arguments": {}})).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources() {
        let server = server();
        let response = call(&server, "resources/list", json!({})).await;
        assert_eq!(
            response.result.unwrap()["resources"][0]["uri"],
            "example://resource"
        );

        let response = call(&server, "resources/read", json!({"uri": "example://resource"})).await;
        assert_eq!(
            response.result.unwrap(),
            json!({"contents": [{
                "uri": "example://resource",
                "mimeType": "text/plain",
                "text": "Example resource content"
            }]})
        );

        let response = call(&server, "resources/read", json!({"uri": "example://missing"})).await;
        assert_eq!(
            response.error.unwrap().message,
            "Unknown resource: example://missing"
        );
    }

    #[tokio::test]
    async fn test_prompts() {
        let server = server();
        let response = call(&server, "prompts/list", json!({})).await;
        assert_eq!(response.result.unwrap()["prompts"][0]["name"], "example_prompt");

        let response = call(
            &server,
            "prompts/get",
            json!({"name": "example_prompt", "arguments": {"topic": "tides"}}),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["messages"][0]["role"], "user");
        assert_eq!(
            result["messages"][0]["content"]["text"],
            "Please provide information about tides"
        );

        let response = call(&server, "prompts/get", json!({"name": "other"})).await;
        assert_eq!(response.error.unwrap().message, "Unknown prompt: other");
    }

    #[tokio::test]
    async fn test_disabled_capabilities() {
        let mut options = ServerOptions::new("bare", "0.1.0");
        options.resources_enabled = false;
        options.prompts_enabled = false;
        let server = McpServer::with_examples(options);

        let caps = serde_json::to_value(server.capabilities()).unwrap();
        assert!(caps.get("resources").is_none());
        assert!(caps.get("prompts").is_none());

        for method in ["resources/list", "resources/read", "prompts/list", "prompts/get"] {
            let response = call(&server, method, json!({})).await;
            assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = call(&server(), "sampling/createMessage", json!({})).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: sampling/createMessage");
    }

    #[tokio::test]
    async fn test_raw_line_handling() {
        let server = server();

        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);

        let response = server.handle_line(r#"{"jsonrpc":"2.0","id":7}"#).await.unwrap();
        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);

        let response = server
            .handle_line(r#"{"jsonrpc":"1.0","id":8,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);

        // A response from the client is not answered
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#)
            .await
            .is_none());

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!("abc"));
        assert_eq!(response.result, Some(json!({})));
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<LoggingLevel>>);

    impl LogLevelSink for RecordingSink {
        fn set_level(&self, level: LoggingLevel) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(level);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_set_level() {
        let sink = Arc::new(RecordingSink::default());
        let server = server().with_log_sink(sink.clone());

        let response = call(&server, "logging/setLevel", json!({"level": "warning"})).await;
        assert_eq!(response.result, Some(json!({})));
        assert_eq!(*sink.0.lock().unwrap(), vec![LoggingLevel::Warning]);

        let response = call(&server, "logging/setLevel", json!({"level": "verbose"})).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_null_id_gets_a_response() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .expect("a present id, even null, makes this a request");
        assert!(response.id.is_null());
        assert_eq!(response.result, Some(json!({})));
    }
}
