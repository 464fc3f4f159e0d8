//! End-to-end tool workflows against the scripted backend: detect, dispatch,
//! then complete a final turn that can see the tool results.

mod common;

use common::MockBackend;
use magpie::{
    Agent, AgentConfig, Error, MessageRole, ResponseFormat, ToolBox, ToolSpec,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn add_spec() -> ToolSpec {
    ToolSpec::new(
        "add",
        "Add two numbers",
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"}
            },
            "required": ["a", "b"]
        }),
    )
}

fn calculator() -> ToolBox {
    ToolBox::new().register("add", |args: Value| async move {
        let a = args["a"].as_i64().unwrap_or(0);
        let b = args["b"].as_i64().unwrap_or(0);
        Ok(json!(a + b))
    })
}

fn agent_with(backend: MockBackend) -> Agent {
    let config = AgentConfig::builder()
        .model("test-model")
        .base_url("http://localhost:1234/v1")
        .build()
        .unwrap();
    Agent::with_backend("Bob", config, Arc::new(backend))
}

#[tokio::test]
async fn test_native_detection_dispatch_and_final_answer() {
    let backend = MockBackend::new();
    backend.push_tool_call("call_1", "add", r#"{"a":10,"b":32}"#);
    backend.push_text("The answer is 42.");

    let mut agent = agent_with(backend);
    agent.add_tool(add_spec());
    agent.add_user_message("What is 10 + 32?");

    let calls = agent.tools_completion().await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function.name, "add");

    let outputs = agent.execute_tool_calls(&calls, &calculator()).await.unwrap();
    assert_eq!(outputs, ["42"]);

    // The dispatch fed the result back into the conversation.
    let tool_message = agent.get_last_message(MessageRole::Tool).unwrap();
    assert_eq!(tool_message.content, "42");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));

    let answer = agent.chat_completion().await.unwrap();
    assert!(answer.contains("42"));
}

#[tokio::test]
async fn test_alternative_detection_dispatch_and_final_answer() {
    let backend = MockBackend::new();
    backend.push_text("Call the add tool with a=10 and b=32.");
    backend.push_text(r#"{"function_calls":[{"name":"add","arguments":{"a":10,"b":32}}]}"#);
    backend.push_text("The answer is 42.");
    let requests = backend.requests();

    let mut agent = agent_with(backend);
    agent.add_tool(add_spec());
    agent.add_user_message("What is 10 + 32?");

    let calls = agent.alternative_tools_completion().await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function.name, "add");

    // Catalog back in place after the protocol.
    assert_eq!(agent.tools().len(), 1);

    let outputs = agent.execute_tool_calls(&calls, &calculator()).await.unwrap();
    assert_eq!(outputs, ["42"]);

    let answer = agent.chat_completion().await.unwrap();
    assert!(answer.contains("42"));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    // Both protocol calls went out tool-free; the second forced JSON mode.
    assert!(requests[0].tools.is_none());
    assert!(requests[1].tools.is_none());
    assert_eq!(
        requests[1].response_format,
        Some(ResponseFormat::json_object())
    );
    // The final turn advertises the restored catalog again.
    assert!(requests[2].tools.is_some());
}

#[tokio::test]
async fn test_alternative_detection_failure_keeps_catalog() {
    let backend = MockBackend::new();
    backend.push_text("Call the add tool with a=1 and b=2.");
    backend.push_error(Error::api("500: server exploded"));

    let mut agent = agent_with(backend);
    agent.add_tool(add_spec());
    agent.add_user_message("What is 1 + 2?");

    let err = agent.alternative_tools_completion().await.unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(agent.tools().len(), 1);
    assert_eq!(agent.tools()[0].name, "add");
}

#[tokio::test]
async fn test_stream_cancellation_on_third_chunk() {
    let backend = MockBackend::new();
    backend.set_chunks(&["alpha ", "beta ", "gamma ", "delta ", "epsilon"]);

    let mut agent = agent_with(backend);
    agent.add_user_message("Count the Greek alphabet.");

    let mut deliveries = 0;
    let failure = agent
        .chat_completion_stream(move |_delta| {
            deliveries += 1;
            if deliveries == 3 {
                Err(Error::other("stop here"))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap_err();

    assert_eq!(failure.partial, "alpha beta gamma ");
    assert!(matches!(failure.error, Error::Other(_)));
}

#[tokio::test]
async fn test_stream_full_run_returns_accumulated_text() {
    let backend = MockBackend::new();
    backend.set_chunks(&["Hello", ", ", "world!"]);

    let mut agent = agent_with(backend);
    agent.add_user_message("Say hello.");

    let mut streamed = String::new();
    let response = agent
        .chat_completion_stream(|delta| {
            streamed.push_str(delta);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(response, "Hello, world!");
    assert_eq!(streamed, "Hello, world!");
}

#[tokio::test]
async fn test_multi_turn_conversation_keeps_history() {
    let backend = MockBackend::new();
    backend.push_text("Bond, James Bond.");
    backend.push_text("A famous fictional spy.");
    let requests = backend.requests();

    let config = AgentConfig::builder()
        .model("test-model")
        .base_url("http://localhost:1234/v1")
        .system_instructions("You are Bob, a laconic assistant.")
        .build()
        .unwrap();
    let mut agent = Agent::with_backend("Bob", config, Arc::new(backend));

    agent.add_user_message("Who is James Bond?");
    let first = agent.chat_completion().await.unwrap();
    agent.add_assistant_message(first);

    agent.add_user_message("Tell me more.");
    agent.chat_completion().await.unwrap();

    let requests = requests.lock().unwrap();
    // Second request carries the whole conversation so far.
    assert_eq!(requests[1].messages.len(), 4);
    assert_eq!(requests[1].messages[0].role, MessageRole::System);
    assert_eq!(requests[1].messages[2].content, "Bond, James Bond.");
}
