use std::time::Duration;

use tokio::time::timeout;
use tutor_model::ModelMessage;
use tutor_test_model::{PresetResponse, TestModelProvider};

use crate::conversation::WELCOME_MESSAGE;
use crate::{
    BackendConfig, ChatError, ConfigurationError, ModelClient,
    ModelClientFactory, TurnStatus, TutorBuilder,
};

const ARTICLE: &str = "Honeybees live in colonies and build hives together.";
const ANALYSIS: &str = "SUMMARY: Bees build hives.\n\
                        STARTER 1: Why cooperative?\n\
                        STARTER 2: What risks?";

fn factory_for(provider: TestModelProvider) -> impl ModelClientFactory {
    move |_: &BackendConfig| -> Result<ModelClient, ConfigurationError> {
        Ok(ModelClient::new(provider.clone()))
    }
}

#[tokio::test]
async fn test_analyze_then_chat() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text(ANALYSIS));
    provider.add_response(PresetResponse::with_text(
        "THINK: user greets me\nRESPONSE: hello",
    ));

    let tutor = TutorBuilder::with_client_factory(factory_for(provider.clone()))
        .build();
    let mut rx = tutor.subscribe();
    assert!(!tutor.state().is_ready());

    let analysis = tutor.analyze(ARTICLE);
    let state = tutor.state();
    assert_eq!(state.article(), ARTICLE);
    assert!(state.is_analysis_loading());
    assert_eq!(state.analysis(), None);
    assert!(rx.has_changed().unwrap());

    let result = analysis.await;
    assert_eq!(result.summary, "Bees build hives.");
    assert_eq!(result.starters, ["Why cooperative?", "What risks?"]);
    let state = rx.borrow_and_update().clone();
    assert!(!state.is_analysis_loading());
    assert!(state.is_ready());
    assert_eq!(state.analysis(), Some(&result));

    let reply = tutor.send_message("hi").unwrap();
    let state = tutor.state();
    assert!(state.is_chat_loading());
    assert_eq!(
        state.history().last(),
        Some(&ModelMessage::User("hi".to_owned()))
    );

    assert_eq!(reply.await, "hello");
    let state = tutor.state();
    assert_eq!(state.turn_status(), TurnStatus::Idle);
    assert_eq!(
        state.history().items(),
        [
            ModelMessage::Assistant(WELCOME_MESSAGE.to_owned()),
            ModelMessage::User("hi".to_owned()),
            ModelMessage::Assistant("hello".to_owned()),
        ]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    // The analysis is a single human message.
    assert_eq!(requests[0].messages.len(), 1);
    let ModelMessage::User(prompt) = &requests[0].messages[0] else {
        panic!("unexpected message: {:?}", requests[0].messages[0]);
    };
    assert!(prompt.contains(ARTICLE));
    assert!(prompt.contains("STARTER 1:"));

    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 3);
    let ModelMessage::System(instructions) = &messages[0] else {
        panic!("unexpected message: {:?}", messages[0]);
    };
    assert!(instructions.contains(ARTICLE));
    assert!(instructions.contains("RESPONSE:"));
    assert_eq!(messages[1..], state.history().items()[..2]);
}

#[tokio::test]
async fn test_context_window() {
    let provider = TestModelProvider::default();
    for i in 0..8 {
        provider.add_response(PresetResponse::with_text(&format!(
            "RESPONSE: reply {i}"
        )));
    }
    let tutor = TutorBuilder::with_client_factory(factory_for(provider.clone()))
        .build();

    // 1 welcome message + 7 turns = 15 messages before the last turn.
    for i in 0..7 {
        let reply = tutor.send_message(format!("message {i}")).unwrap().await;
        assert_eq!(reply, format!("reply {i}"));
    }
    assert_eq!(tutor.state().history().len(), 15);
    tutor.send_message("message 7").unwrap().await;

    let requests = provider.requests();
    let messages = &requests.last().unwrap().messages;
    // The system message, 10 prior messages and the new one.
    assert_eq!(messages.len(), 12);
    assert!(matches!(messages[0], ModelMessage::System(_)));
    assert_eq!(messages[1], ModelMessage::User("message 2".to_owned()));
    assert_eq!(messages[10], ModelMessage::Assistant("reply 6".to_owned()));
    assert_eq!(messages[11], ModelMessage::User("message 7".to_owned()));

    // Nothing is dropped from the history itself.
    let state = tutor.state();
    assert_eq!(state.history().len(), 17);
    assert_eq!(state.history().items()[1].content(), "message 0");
}

#[tokio::test]
async fn test_chat_error() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_failure("timeout"));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider))
        .build();

    let reply = tutor.send_message("hi").unwrap().await;
    assert!(reply.contains("timeout"));

    let state = tutor.state();
    assert_eq!(state.turn_status(), TurnStatus::Idle);
    assert_eq!(state.history().len(), 3);
    assert_eq!(
        state.history().last(),
        Some(&ModelMessage::Assistant(
            "Sorry, an error occurred: timeout".to_owned()
        ))
    );
}

#[tokio::test]
async fn test_rejected_messages() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text("RESPONSE: first"));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider))
        .build();

    assert_eq!(tutor.send_message(" \n").err(), Some(ChatError::EmptyMessage));
    assert_eq!(tutor.state().history().len(), 1);

    let first = tutor.send_message("first").unwrap();
    assert_eq!(
        tutor.send_message("second").err(),
        Some(ChatError::TurnInFlight)
    );
    assert_eq!(tutor.state().history().len(), 2);

    assert_eq!(first.await, "first");
    assert_eq!(tutor.state().history().len(), 3);
}

#[tokio::test]
async fn test_send_starter() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text(ANALYSIS));
    provider.add_response(PresetResponse::with_text("RESPONSE: Good question."));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider))
        .build();

    assert_eq!(
        tutor.send_starter(0).err(),
        Some(ChatError::NoSuchStarter(0))
    );
    tutor.analyze(ARTICLE).await;
    assert_eq!(
        tutor.send_starter(2).err(),
        Some(ChatError::NoSuchStarter(2))
    );

    tutor.send_starter(1).unwrap().await;
    let state = tutor.state();
    assert_eq!(state.history().items()[1].content(), "What risks?");
    assert_eq!(state.history().items()[2].content(), "Good question.");
}

#[tokio::test]
async fn test_analysis_parse_failure() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text("SUMMARY: Bees."));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider))
        .build();

    let result = tutor.analyze(ARTICLE).await;
    assert_eq!(
        result.summary,
        "Analysis failed: Unable to parse conversation starters."
    );
    assert!(result.starters.is_empty());

    let state = tutor.state();
    assert!(!state.is_analysis_loading());
    assert!(!state.is_ready());
    assert_eq!(state.analysis(), Some(&result));
}

#[tokio::test]
async fn test_unknown_backend() {
    let provider = TestModelProvider::default();
    let tutor =
        TutorBuilder::with_client_factory(factory_for(provider.clone()))
            .build();
    tutor.settings().set_backend("gpt");

    let result = tutor.analyze(ARTICLE).await;
    assert_eq!(
        result.summary,
        "Analysis failed: Invalid backend selected: `gpt`."
    );

    let reply = tutor.send_message("hi").unwrap().await;
    assert_eq!(
        reply,
        "Sorry, an error occurred: Invalid backend selected: `gpt`."
    );
    assert!(provider.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_analysis_discarded() {
    let mut slow = TestModelProvider::default();
    slow.set_delay(Duration::from_millis(100));
    slow.add_response(PresetResponse::with_text(
        "SUMMARY: Old.\nSTARTER 1: Old question?",
    ));
    let fast = TestModelProvider::default();
    fast.add_response(PresetResponse::with_text(ANALYSIS));

    let factory = move |config: &BackendConfig| {
        let provider = match config.model.as_deref() {
            Some("slow") => slow.clone(),
            _ => fast.clone(),
        };
        Ok::<_, ConfigurationError>(ModelClient::new(provider))
    };
    let tutor = TutorBuilder::with_client_factory(factory).build();

    tutor.settings().set_model(Some("slow".to_owned()));
    let first = tutor.analyze("old article");
    tutor.settings().set_model(None);
    let second = tutor.analyze(ARTICLE);

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.summary, "Old.");
    assert_eq!(second.summary, "Bees build hives.");

    let state = tutor.state();
    assert_eq!(state.article(), ARTICLE);
    assert_eq!(state.analysis(), Some(&second));
    assert!(!state.is_analysis_loading());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_analysis_is_retried() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text(ANALYSIS).with_failures(1));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider.clone()))
        .build();

    let result = tutor.analyze(ARTICLE).await;
    assert!(result.is_usable());
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_custom_context_window() {
    let provider = TestModelProvider::default();
    for i in 0..3 {
        provider.add_response(PresetResponse::with_text(&format!(
            "RESPONSE: reply {i}"
        )));
    }
    let tutor = TutorBuilder::with_client_factory(factory_for(provider.clone()))
        .with_context_window(2)
        .build();

    for i in 0..3 {
        tutor.send_message(format!("message {i}")).unwrap().await;
    }

    let requests = provider.requests();
    assert_eq!(requests[0].messages.len(), 3);
    assert_eq!(
        requests[2].messages[1..],
        [
            ModelMessage::User("message 1".to_owned()),
            ModelMessage::Assistant("reply 1".to_owned()),
            ModelMessage::User("message 2".to_owned()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_turn_ends() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_secs(5));
    provider.add_response(PresetResponse::with_text("RESPONSE: too late"));
    provider.add_response(PresetResponse::with_text("RESPONSE: on time"));
    let tutor = TutorBuilder::with_client_factory(factory_for(provider))
        .build();

    let reply = tutor.send_message("hello?").unwrap();
    assert!(timeout(Duration::from_secs(1), reply).await.is_err());

    let state = tutor.state();
    assert_eq!(state.turn_status(), TurnStatus::Idle);
    assert_eq!(
        state.history().last(),
        Some(&ModelMessage::Assistant(
            "Sorry, an error occurred: The reply was cancelled.".to_owned()
        ))
    );

    // The session accepts messages again.
    assert_eq!(tutor.send_message("still there?").unwrap().await, "on time");
    assert_eq!(tutor.state().history().len(), 5);
}

#[tokio::test]
async fn test_unpolled_turn_ends() {
    let provider = TestModelProvider::default();
    let tutor = TutorBuilder::with_client_factory(factory_for(provider.clone()))
        .build();

    drop(tutor.send_message("hi").unwrap());

    let state = tutor.state();
    assert_eq!(state.turn_status(), TurnStatus::Idle);
    assert_eq!(state.history().len(), 3);
    assert!(provider.requests().is_empty());
}
