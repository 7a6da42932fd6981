pub mod examples;
mod registry;

pub use examples::{ExampleGetRequestTool, ExamplePostRequestTool, ExampleTool};
pub use registry::{
    json_schema_any_object, json_schema_array, json_schema_boolean, json_schema_number,
    json_schema_object, json_schema_string, Tool, ToolRegistry,
};
