//! Chat client against mock backends: streamed sends and offline fallbacks.

use crate::mock_server::{
    chunked_server, init_tracing, stalled_error_server, test_client, truncated_chunked_server,
    unreachable_addr, MockServerFixture,
};
use chat_stream_client::store::{LocalStore, MemoryStore, PersistedState};
use chat_stream_client::stream::StreamState;
use chat_stream_client::transport::TransportError;
use chat_stream_client::types::{builtin_templates, ConversationState, Message};
use chat_stream_client::{CancelHandle, ChatClient, ChatContext, Error, StreamUpdate, TtlCache};
use mockito::Matcher;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn collecting() -> (Arc<Mutex<Vec<StreamUpdate>>>, impl FnMut(StreamUpdate) + Send) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink_updates = updates.clone();
    (updates, move |u: StreamUpdate| sink_updates.lock().unwrap().push(u))
}

fn offline_client(addr: std::net::SocketAddr, store: Arc<dyn LocalStore>) -> ChatClient {
    test_client(&format!("http://{addr}"), store)
}

#[tokio::test]
async fn send_message_streams_reply_and_stores_assigned_user_id() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/api/message")
            .match_body(Matcher::PartialJson(json!({
                "content": "Hi there",
                "is_enhanced": false,
                "model": "phi4"
            })))
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("USER_ID: abc123\nHello world")
            .create_async()
            .await
    };
    let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let client = fixture.client_with_store(store.clone());
    let (updates, sink) = collecting();

    let outcome = client
        .send_message("  Hi there ", &ChatContext::new(), sink, &CancelHandle::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.user_message.content(), "Hi there");
    assert_eq!(outcome.ai_message.content(), "Hello world");
    assert_eq!(outcome.extracted_user_id.as_deref(), Some("abc123"));

    let updates = updates.lock().unwrap();
    assert_eq!(updates[0], StreamUpdate::ControlValue("abc123".into()));
    assert_eq!(
        updates.last(),
        Some(&StreamUpdate::Text("Hello world".into()))
    );
    assert_eq!(
        PersistedState::new(store).user_id().as_deref(),
        Some("abc123")
    );
}

#[tokio::test]
async fn known_user_id_is_sent_and_not_overwritten() {
    let fixture = MockServerFixture::new().await;
    let _mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/api/message")
            .match_body(Matcher::PartialJson(json!({
                "user_id": "u-known",
                "selected_category": "Learning",
                "is_enhanced": true
            })))
            .with_status(200)
            .with_body("USER_ID: other\nok")
            .create_async()
            .await
    };
    let client = fixture.client();
    let context = ChatContext::new()
        .user_id("u-known")
        .selected_category("Learning")
        .enhance(true);

    let outcome = client
        .send_message("explain lifetimes", &context, |_u: StreamUpdate| {}, &CancelHandle::new())
        .await
        .unwrap();
    assert!(outcome.user_message.is_enhanced());
    assert_eq!(outcome.extracted_user_id.as_deref(), Some("other"));
    assert_eq!(client.persisted().user_id(), None);
}

#[tokio::test]
async fn non_success_status_is_a_remote_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json("POST", "/api/message", 500, r#"{"detail":"boom"}"#, 1)
        .await;
    let client = fixture.client();
    let (updates, sink) = collecting();

    let err = client
        .send_message("hello", &ChatContext::new(), sink, &CancelHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { status: 500, .. }));
    assert!(updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stalled_error_body_is_bounded_by_timeout() {
    init_tracing();
    let addr = stalled_error_server().await;
    let client = ChatClient::builder()
        .base_url(format!("http://{addr}"))
        .timeout(Duration::from_millis(300))
        .store(Arc::new(MemoryStore::new()))
        .cache(Arc::new(TtlCache::new()))
        .build()
        .unwrap();
    let (updates, sink) = collecting();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.send_message("hello", &ChatContext::new(), sink, &CancelHandle::new()),
    )
    .await
    .expect("error body read should give up after the client timeout");

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Timeout(_)))
    ));
    assert!(updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stalled_error_body_is_abortable() {
    let addr = stalled_error_server().await;
    let client = offline_client(addr, Arc::new(MemoryStore::new()));
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(4),
        client.send_message("hello", &ChatContext::new(), |_u: StreamUpdate| {}, &cancel),
    )
    .await
    .expect("cancel should stop the error body read");

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Aborted))
    ));
}

#[tokio::test]
async fn user_id_is_kept_when_stream_breaks_after_first_chunk() {
    let addr = truncated_chunked_server(vec![b"USER_ID: zz9\nHello".to_vec()]).await;
    let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let client = offline_client(addr, store.clone());
    let (updates, sink) = collecting();

    let err = client
        .send_message("hi", &ChatContext::new(), sink, &CancelHandle::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(
        *updates.lock().unwrap(),
        vec![
            StreamUpdate::ControlValue("zz9".into()),
            StreamUpdate::Text("Hello".into()),
        ]
    );
    assert_eq!(client.persisted().user_id().as_deref(), Some("zz9"));
    assert_eq!(PersistedState::new(store).user_id().as_deref(), Some("zz9"));
}

#[tokio::test]
async fn empty_message_is_rejected_without_a_request() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_json("POST", "/api/message", 200, "{}", 0).await;
    let client = fixture.client();

    let err = client
        .send_message("   ", &ChatContext::new(), |_u: StreamUpdate| {}, &CancelHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn multibyte_character_split_across_network_chunks() {
    let addr = chunked_server(
        vec![b"na\xc3".to_vec(), b"\xafve".to_vec()],
        Duration::from_millis(100),
    )
    .await;
    let client = offline_client(addr, Arc::new(MemoryStore::new()));
    let (updates, sink) = collecting();

    let outcome = client
        .send_message("word?", &ChatContext::new(), sink, &CancelHandle::new())
        .await
        .unwrap();
    assert_eq!(outcome.ai_message.content(), "naïve");
    assert_eq!(
        *updates.lock().unwrap(),
        vec![
            StreamUpdate::Text("na".into()),
            StreamUpdate::Text("naïve".into()),
        ]
    );
}

#[tokio::test]
async fn cancelling_mid_stream_keeps_partial_reply() {
    let addr = chunked_server(
        vec![b"first ".to_vec(), b"second".to_vec()],
        Duration::from_millis(300),
    )
    .await;
    let client = offline_client(addr, Arc::new(MemoryStore::new()));
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    let calls = Arc::new(Mutex::new(0usize));
    let sink_calls = calls.clone();

    let outcome = client
        .send_message(
            "long answer please",
            &ChatContext::new(),
            move |_u: StreamUpdate| {
                *sink_calls.lock().unwrap() += 1;
                trigger.cancel();
            },
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, StreamState::Cancelled);
    assert_eq!(outcome.ai_message.content(), "first ");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn disabled_control_markers_show_prefix_verbatim() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_text_stream("/api/message", "USER_ID: is a field name\n")
        .await;
    let client = ChatClient::builder()
        .base_url(&fixture.base_url)
        .control_markers(Vec::<String>::new())
        .cache(Arc::new(chat_stream_client::TtlCache::new()))
        .build()
        .unwrap();

    let outcome = client
        .send_message("what is USER_ID?", &ChatContext::new(), |_u: StreamUpdate| {}, &CancelHandle::new())
        .await
        .unwrap();
    assert_eq!(outcome.ai_message.content(), "USER_ID: is a field name\n");
    assert_eq!(outcome.extracted_user_id, None);
}

#[tokio::test]
async fn load_user_is_cached() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json(
            "GET",
            "/api/user",
            200,
            r#"{"id":"u-42","name":"Ada","preferences":{"selectedCategory":"Learning","modelPreference":"deepseek"}}"#,
            1,
        )
        .await;
    let client = fixture.client();

    let first = client.load_user().await;
    let second = client.load_user().await;
    mock.assert_async().await;

    assert!(first.is_online());
    assert_eq!(first, second);
    assert_eq!(first.preferences.model_preference, "deepseek");
    assert_eq!(client.persisted().user_id().as_deref(), Some("u-42"));
}

#[tokio::test]
async fn offline_user_falls_back_to_a_stable_local_profile() {
    let addr = unreachable_addr().await;
    let client = offline_client(addr, Arc::new(MemoryStore::new()));

    let first = client.load_user().await;
    assert!(!first.is_online());
    let second = client.load_user().await;
    assert_eq!(first.id, second.id);
    assert_eq!(client.persisted().user_id(), Some(first.id));
}

#[tokio::test]
async fn templates_fall_back_to_builtin_set() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json("GET", "/api/prompt-templates", 200, "[]", 1)
        .await;
    assert_eq!(fixture.client().load_templates().await, builtin_templates());

    let offline = offline_client(unreachable_addr().await, Arc::new(MemoryStore::new()));
    assert_eq!(offline.load_templates().await, builtin_templates());
}

#[tokio::test]
async fn backend_templates_are_used_when_present() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json(
            "GET",
            "/api/prompt-templates",
            200,
            r#"[{"id":"t-1","category":"Ops","title":"Runbook","template":"Write a runbook for:"}]"#,
            1,
        )
        .await;
    let templates = fixture.client().load_templates().await;
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].icon, "");
}

#[tokio::test]
async fn conversations_are_cached_mirrored_and_invalidated() {
    let fixture = MockServerFixture::new().await;
    let convs = ConversationState::new()
        .with_current_messages(vec![Message::user("hello"), Message::ai("hi")])
        .start_new()
        .conversations;
    let body = serde_json::to_string(&convs).unwrap();
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", Matcher::Regex("^/api/conversations".into()))
            .match_query(Matcher::UrlEncoded("user_id".into(), "u 1".into()))
            .expect(2)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    };
    let client = fixture.client();

    assert_eq!(client.load_conversations("u 1").await, convs);
    assert_eq!(client.load_conversations("u 1").await, convs);
    assert_eq!(client.invalidate_conversations(), 1);
    assert_eq!(client.load_conversations("u 1").await, convs);
    mock.assert_async().await;
    assert_eq!(client.persisted().load_conversations(), convs);
}

#[tokio::test]
async fn offline_conversations_come_from_the_store() {
    let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let convs = ConversationState::new()
        .with_current_messages(vec![Message::user("saved earlier")])
        .start_new()
        .conversations;
    PersistedState::new(store.clone())
        .save_conversations(&convs)
        .unwrap();

    let client = offline_client(unreachable_addr().await, store);
    assert_eq!(client.load_conversations("u-1").await, convs);

    let empty = offline_client(unreachable_addr().await, Arc::new(MemoryStore::new()));
    assert!(empty.load_conversations("u-1").await.is_empty());
}

#[tokio::test]
async fn enhance_prompt_round_trip() {
    let fixture = MockServerFixture::new().await;
    let _mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/api/enhance-prompt")
            .match_body(Matcher::Json(json!({"prompt": "sort a list"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"originalPrompt":"sort a list","enhancedPrompt":"Please sort a list, step by step."}"#)
            .create_async()
            .await
    };
    let info = fixture.client().enhance_prompt(" sort a list ").await.unwrap();
    assert_eq!(info.original_prompt, "sort a list");
    assert_eq!(
        info.enhanced_prompt.as_deref(),
        Some("Please sort a list, step by step.")
    );
}

#[tokio::test]
async fn enhance_prompt_offline_is_a_transport_error() {
    let client = offline_client(unreachable_addr().await, Arc::new(MemoryStore::new()));
    let err = client.enhance_prompt("anything").await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Http(_))));
}

#[tokio::test]
async fn export_and_template_selection() {
    let client = offline_client(unreachable_addr().await, Arc::new(MemoryStore::new()));
    client.persisted().set_user_id("u-5").unwrap();

    let export = client.export_chat(&[Message::user("q"), Message::ai("a")], None);
    assert_eq!(export.user_id.as_deref(), Some("u-5"));
    assert_eq!(export.messages.len(), 2);

    let user = client.load_user().await;
    let template = &builtin_templates()[2];
    let mut inserted = String::new();
    let updated = client.select_template(template, &user, |text| inserted.push_str(text));
    assert_eq!(inserted, template.template);
    assert_eq!(
        updated.preferences.selected_category.as_deref(),
        Some("Code Analysis")
    );
    assert_eq!(user.preferences.selected_category, None);
}
