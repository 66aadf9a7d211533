//! Integration tests for the Ollama client against a loopback server

mod common;

use common::{spawn, Route};
use futures_util::{pin_mut, StreamExt};
use ollamachat::streaming::{chat_events, collect_generate, ChatEvent, GenerationOptions, Timeouts};
use ollamachat::{ClientError, Message, OllamaClient};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const TAGS: &str = r#"{"models":[
    {"name":"llama3.1:8b","size":4920753328,"modified_at":"2024-08-01T10:00:00Z","digest":"abc",
     "details":{"family":"llama","parameter_size":"8.0B","quantization_level":"Q4_0"}},
    {"name":"tinyllama:latest","size":637700138}
]}"#;

fn client(url: &str) -> OllamaClient {
    OllamaClient::with_config(url, Timeouts::default()).unwrap()
}

fn short_timeout_client(url: &str, request: Duration) -> OllamaClient {
    let timeouts = Timeouts {
        request,
        ..Timeouts::default()
    };
    OllamaClient::with_config(url, timeouts).unwrap()
}

#[tokio::test]
async fn test_list_models() {
    let server = spawn(vec![Route::get("/api/tags", TAGS)]).await;
    let models = assert_ok!(client(&server.url).list_models().await);

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3.1:8b");
    assert_eq!(models[0].formatted_size(), "4.58 GB");
    assert_eq!(models[1].name, "tinyllama:latest");
    assert!(models[1].details.is_none());
}

#[tokio::test]
async fn test_is_available() {
    let server = spawn(vec![Route::get("/api/tags", r#"{"models":[]}"#)]).await;
    assert!(client(&server.url).is_available().await);
    assert!(!client("http://127.0.0.1:1").is_available().await);
}

#[tokio::test]
async fn test_generate_stream_with_split_line() {
    let server = spawn(vec![Route::post(
        "/api/generate",
        &[
            "{\"response\":\"A\",\"done\":false}\n{\"respon",
            "se\":\"B\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true,\"eval_count\":2}\n",
        ],
    )])
    .await;

    let chunks = client(&server.url)
        .generate_stream("tinyllama", "hi", &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(collect_generate(chunks).await.unwrap(), "AB");

    let request = server.last_request("/api/generate").json();
    assert_eq!(request["model"], "tinyllama");
    assert_eq!(request["prompt"], "hi");
    assert_eq!(request["stream"], true);
    assert!(request.get("options").is_none());
}

#[tokio::test]
async fn test_generate_stream_skips_malformed_line() {
    let server = spawn(vec![Route::post(
        "/api/generate",
        &["{\"response\":\"A\",\"done\":false}\nnot json\n{\"response\":\"B\",\"done\":true}"],
    )])
    .await;

    let chunks = client(&server.url)
        .generate_stream("tinyllama", "hi", &GenerationOptions::default())
        .await
        .unwrap();
    // The last line has no trailing newline and is still decoded
    assert_eq!(collect_generate(chunks).await.unwrap(), "AB");
}

#[tokio::test]
async fn test_generate_non_streaming() {
    let server = spawn(vec![Route::post(
        "/api/generate",
        &[r#"{"response":"Waves fold on the shore","done":true}"#],
    )])
    .await;

    let response = client(&server.url)
        .generate("tinyllama", "haiku", &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(response.response, "Waves fold on the shore");
    assert_eq!(server.last_request("/api/generate").json()["stream"], false);
}

#[tokio::test]
async fn test_chat_stream_thinking_then_content() {
    let server = spawn(vec![Route::post(
        "/api/chat",
        &[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\",\"thinking\":\"hmm\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\",\"thinking\":\"more\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ],
    )])
    .await;

    let messages = vec![Message::user("hello")];
    let options = GenerationOptions {
        temperature: Some(0.7),
        num_predict: Some(3000),
        num_ctx: Some(4096),
        keep_alive: Some("5m".to_string()),
    };
    let chunks = client(&server.url)
        .chat_stream("gpt-oss:20b", &messages, &options)
        .await
        .unwrap();
    let events = chat_events(chunks);
    pin_mut!(events);

    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        seen.push(event.unwrap());
    }
    assert_eq!(
        seen,
        vec![
            ChatEvent::Thinking,
            ChatEvent::Content("Hi".to_string()),
            ChatEvent::Done {
                text: "Hi".to_string()
            },
        ]
    );

    let request = server.last_request("/api/chat").json();
    assert_eq!(request["messages"][0]["role"], "user");
    assert_eq!(request["messages"][0]["content"], "hello");
    assert_eq!(request["options"]["num_predict"], 3000);
    assert_eq!(request["options"]["num_ctx"], 4096);
    assert_eq!(request["keep_alive"], "5m");
}

#[tokio::test]
async fn test_chat_non_streaming() {
    let server = spawn(vec![Route::post(
        "/api/chat",
        &[r#"{"message":{"role":"assistant","content":"Late autumn to spring."},"done":true}"#],
    )])
    .await;

    let response = client(&server.url)
        .chat("tinyllama", &[Message::user("When?")], &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(response.content(), Some("Late autumn to spring."));
}

#[tokio::test]
async fn test_openai_chat_sends_bearer_key() {
    let server = spawn(vec![Route::post(
        "/v1/chat/completions",
        &[r#"{"choices":[{"message":{"role":"assistant","content":"Hello from Dubai!"}}]}"#],
    )])
    .await;

    let messages = vec![
        Message::system("You are a helpful assistant."),
        Message::user("Say hello from Dubai!"),
    ];
    let reply = client(&server.url)
        .openai_chat("tinyllama", &messages, 0.7, 500)
        .await
        .unwrap();
    assert_eq!(reply, "Hello from Dubai!");

    let request = server.last_request("/v1/chat/completions");
    assert!(request.head.contains("authorization: bearer ollama"));
    assert_eq!(request.json()["max_tokens"], 500);
}

#[tokio::test]
async fn test_api_error_status() {
    let server = spawn(vec![
        Route::post("/api/generate", &[r#"{"error":"model 'nope' not found"}"#]).with_status(404),
    ])
    .await;

    let err = assert_err!(
        client(&server.url)
            .generate("nope", "hi", &GenerationOptions::default())
            .await
    );
    match err {
        ClientError::Api { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server() {
    let err = client("http://127.0.0.1:1").list_models().await.unwrap_err();
    assert!(err.is_unreachable());
    assert!(err.to_string().contains("ollama serve"));
}

#[tokio::test]
async fn test_long_steady_stream_outlives_request_timeout() {
    // 80 parts 20ms apart take well over the one second limit in total
    let lines: Vec<String> = (0..80)
        .map(|i| format!("{{\"response\":\"{}\",\"done\":{}}}\n", i % 10, i == 79))
        .collect();
    let parts: Vec<&str> = lines.iter().map(String::as_str).collect();
    let server = spawn(vec![Route::post("/api/generate", &parts)]).await;

    let chunks = short_timeout_client(&server.url, Duration::from_secs(1))
        .generate_stream("tinyllama", "count", &GenerationOptions::default())
        .await
        .unwrap();
    pin_mut!(chunks);

    let mut count = 0;
    while let Some(chunk) = chunks.next().await {
        assert_ok!(chunk);
        count += 1;
    }
    assert_eq!(count, 80);
}

#[tokio::test]
async fn test_stalled_stream_times_out_after_partial_text() {
    let server = spawn(vec![Route::post(
        "/api/generate",
        &[
            "{\"response\":\"Par\",\"done\":false}\n",
            "{\"response\":\"tial\",\"done\":true}\n",
        ],
    )
    .with_stall(0, Duration::from_secs(2))])
    .await;

    let chunks = short_timeout_client(&server.url, Duration::from_millis(300))
        .generate_stream("tinyllama", "hi", &GenerationOptions::default())
        .await
        .unwrap();
    pin_mut!(chunks);

    let first = assert_ok!(chunks.next().await.unwrap());
    assert_eq!(first.response, "Par");
    let err = assert_err!(chunks.next().await.unwrap());
    assert!(err.is_timeout());
    assert!(chunks.next().await.is_none());
}

#[tokio::test]
async fn test_generate_times_out_on_slow_server() {
    let server = spawn(vec![Route::post(
        "/api/generate",
        &[r#"{"response":"late","done":true}"#],
    )
    .with_delay(Duration::from_secs(2))])
    .await;
    let client = short_timeout_client(&server.url, Duration::from_millis(300));

    let err = assert_err!(client.generate("tinyllama", "hi", &GenerationOptions::default()).await);
    assert!(err.is_timeout(), "expected Timeout, got {:?}", err);

    match client
        .generate_stream("tinyllama", "hi", &GenerationOptions::default())
        .await
    {
        Err(err) => assert!(err.is_timeout(), "expected Timeout, got {:?}", err),
        Ok(_) => panic!("expected Timeout before the stream started"),
    }
}

#[tokio::test]
async fn test_chat_times_out_on_slow_server() {
    let server = spawn(vec![Route::post(
        "/api/chat",
        &[r#"{"message":{"role":"assistant","content":"late"},"done":true}"#],
    )
    .with_delay(Duration::from_secs(2))])
    .await;

    let err = assert_err!(
        short_timeout_client(&server.url, Duration::from_millis(300))
            .chat("tinyllama", &[Message::user("hi")], &GenerationOptions::default())
            .await
    );
    assert!(err.is_timeout(), "expected Timeout, got {:?}", err);
    assert!(err.truncation_notice().contains("timeout"));
}
