use rethink_protocol::{AnalyzeRequest, ChatRequest, ErrorCode, Subject};
use rethink_tutor::prompt::subject_context;
use rethink_tutor::{
    GateState, ProviderError, ResponseMode, StubProvider, TutorConfig, TutorError, TutorService,
    LLM_UNAVAILABLE,
};
use std::sync::Arc;

const MATH_ERROR: &str = r#"{"hasError": true, "internalError": "arithmetic mistake", "location": "On the most recent step."}"#;
const CLEAN: &str = r#"{"hasError": false}"#;

fn setup() -> (TutorService, Arc<StubProvider>) {
    let stub = Arc::new(StubProvider::new(ResponseMode::Native));
    let service = TutorService::new(stub.clone(), TutorConfig::default());
    (service, stub)
}

fn analyze(session_id: Option<&str>, text: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        session_id: session_id.map(str::to_string),
        subject: Some("math".to_string()),
        full_text: Some(text.to_string()),
        new_content: Some(text.to_string()),
    }
}

fn chat(session_id: &str, message: &str) -> ChatRequest {
    ChatRequest {
        session_id: Some(session_id.to_string()),
        message: Some(message.to_string()),
    }
}

async fn history_len(service: &TutorService, id: &str) -> usize {
    service
        .store()
        .get(id)
        .expect("session exists")
        .lock()
        .await
        .chat_history()
        .len()
}

#[tokio::test]
async fn detection_opens_gate_with_empty_history() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);

    let resp = service.analyze(analyze(None, "2+2=5")).await.unwrap();
    assert!(resp.has_error);
    assert!(resp.has_active_error);
    assert_eq!(resp.location.as_deref(), Some("On the most recent step."));
    assert!(uuid_like(&resp.session_id));

    let session = service.store().get(&resp.session_id).unwrap();
    let session = session.lock().await;
    assert_eq!(session.state(), GateState::ErrorActive);
    assert!(session.chat_history().is_empty());
    assert_eq!(session.full_text(), "2+2=5");
}

#[tokio::test]
async fn each_analysis_is_judged_by_its_own_subject() {
    let (service, stub) = setup();
    stub.push_reply(CLEAN);
    let mut prose = analyze(None, "The cat sat on the warm mat.");
    prose.subject = Some("writing".to_string());
    let id = service.analyze(prose).await.unwrap().session_id;

    stub.push_reply(MATH_ERROR);
    let resp = service
        .analyze(analyze(Some(&id), "The cat sat on the warm mat.\n3 * 3 = 10"))
        .await
        .unwrap();
    assert_eq!(resp.session_id, id);

    let requests = stub.requests();
    let math_prompt = &requests[1].messages[0].content;
    assert!(math_prompt.contains(subject_context(Subject::Math)));
    assert!(!math_prompt.contains(subject_context(Subject::Writing)));

    let session = service.store().get(&id).unwrap();
    assert_eq!(session.lock().await.subject(), Subject::Writing);
}

#[tokio::test]
async fn chat_before_detection_is_refused() {
    let (service, stub) = setup();
    stub.push_reply(CLEAN);
    let resp = service.analyze(analyze(None, "2+2=4")).await.unwrap();

    let err = service.chat(chat(&resp.session_id, "hello")).await.unwrap_err();
    assert!(matches!(err, TutorError::NoActiveError));
    assert_eq!(err.code(), ErrorCode::NoActiveError);
    // Only the analysis reached the provider.
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn new_detection_resets_dialogue() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    stub.push_reply("Which step would you check first?");
    let first = service.chat(chat(&id, "a")).await.unwrap();
    assert_eq!(first.reply, "Which step would you check first?");
    assert!(first.has_active_error);
    service.chat(chat(&id, "b")).await.unwrap();
    assert_eq!(history_len(&service, &id).await, 4);

    stub.push_reply(MATH_ERROR);
    let resp = service
        .analyze(analyze(Some(&id), "2+2=5\n3+3=7"))
        .await
        .unwrap();
    assert_eq!(resp.session_id, id);
    assert_eq!(history_len(&service, &id).await, 0);

    assert!(service.chat(chat(&id, "c")).await.is_ok());
    assert_eq!(history_len(&service, &id).await, 2);
}

#[tokio::test]
async fn chat_prompt_carries_history_in_order() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    stub.push_reply("first hint");
    service.chat(chat(&id, "is it 2?")).await.unwrap();
    stub.push_reply("second hint");
    service.chat(chat(&id, "is it the sum?")).await.unwrap();

    let last = stub.requests().pop().unwrap();
    let contents: Vec<_> = last.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 4);
    assert!(contents[0].contains("arithmetic mistake"));
    assert_eq!(&contents[1..], &["is it 2?", "first hint", "is it the sum?"]);
    assert!(!last.structured);
}

#[tokio::test]
async fn clean_analysis_closes_gate() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    stub.push_reply(CLEAN);
    let resp = service
        .analyze(analyze(Some(&id), "2+2=4"))
        .await
        .unwrap();
    assert!(!resp.has_error);
    assert!(!resp.has_active_error);
    assert!(resp.location.is_none());

    let err = service.chat(chat(&id, "hello?")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoActiveError);
}

#[tokio::test]
async fn provider_failure_leaves_gate_untouched() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    stub.push_failure(ProviderError::Status {
        status: 429,
        body: "rate limited".to_string(),
    });
    let err = service
        .analyze(analyze(Some(&id), "2+2=5\n4+4=9"))
        .await
        .unwrap_err();
    let envelope = err.envelope();
    assert_eq!(envelope.code, ErrorCode::LlmError);
    assert_eq!(envelope.error, LLM_UNAVAILABLE);

    let session = service.store().get(&id).unwrap();
    let session = session.lock().await;
    assert_eq!(session.state(), GateState::ErrorActive);
    assert_eq!(session.error_location(), Some("On the most recent step."));
    assert_eq!(session.full_text(), "2+2=5\n4+4=9");
}

#[tokio::test]
async fn failed_chat_does_not_record_exchange() {
    let (service, stub) = setup();
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    stub.push_failure(ProviderError::Transport("connection reset".to_string()));
    let err = service.chat(chat(&id, "help")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::LlmError);
    assert_eq!(history_len(&service, &id).await, 0);
}

#[tokio::test]
async fn concurrent_chats_on_one_session_serialize() {
    let stub = Arc::new(
        StubProvider::new(ResponseMode::Native)
            .with_delay(std::time::Duration::from_millis(20)),
    );
    let service = Arc::new(TutorService::new(stub.clone(), TutorConfig::default()));
    stub.push_reply(MATH_ERROR);
    let id = service
        .analyze(analyze(None, "2+2=5"))
        .await
        .unwrap()
        .session_id;

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            service.chat(chat(&id, &format!("msg {i}"))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let session = service.store().get(&id).unwrap();
    let session = session.lock().await;
    let history = session.chat_history();
    assert_eq!(history.len(), 16);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, rethink_protocol::ChatRole::User);
        assert_eq!(pair[1].role, rethink_protocol::ChatRole::Assistant);
    }
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}
