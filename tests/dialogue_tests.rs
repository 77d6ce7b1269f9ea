use anyhow::Result;

use poll_quiz_bot::dialogue::{QuizDialogue, QuizDialogueState};
use poll_quiz_bot::question_bank::{CatalogLevel, TestRef};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::ChatId;

/// Test the admin flow transitions through in-memory storage
#[tokio::test]
async fn test_admin_flow_transitions() -> Result<()> {
    let storage = InMemStorage::<QuizDialogueState>::new();
    let dialogue = QuizDialogue::new(storage.clone(), ChatId(42));

    // Nothing stored yet means the default state
    assert_eq!(dialogue.get_or_default().await?, QuizDialogueState::Start);

    dialogue
        .update(QuizDialogueState::AwaitingName {
            parent: vec!["Biology".to_string()],
            language_code: Some("en".to_string()),
        })
        .await?;
    let state = dialogue.get_or_default().await?;
    assert_eq!(state.naming_level(), Some(CatalogLevel::SubSubject));

    dialogue
        .update(QuizDialogueState::AwaitingUpload {
            path: ["Biology", "Cells", "Mitosis", "Test_3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            replacing: false,
            language_code: Some("en".to_string()),
        })
        .await?;
    let state = dialogue.get_or_default().await?;
    assert_eq!(
        state.upload_target(),
        Some(TestRef::new("Biology", "Cells", "Mitosis", "Test_3"))
    );

    dialogue.exit().await?;
    assert_eq!(dialogue.get_or_default().await?, QuizDialogueState::Start);

    Ok(())
}

/// Test that chats do not share dialogue state
#[tokio::test]
async fn test_dialogues_are_per_chat() -> Result<()> {
    let storage = InMemStorage::<QuizDialogueState>::new();
    let admin_chat = QuizDialogue::new(storage.clone(), ChatId(1));
    let other_chat = QuizDialogue::new(storage.clone(), ChatId(2));

    admin_chat
        .update(QuizDialogueState::AwaitingName {
            parent: Vec::new(),
            language_code: None,
        })
        .await?;

    assert!(matches!(
        admin_chat.get_or_default().await?,
        QuizDialogueState::AwaitingName { .. }
    ));
    assert_eq!(other_chat.get_or_default().await?, QuizDialogueState::Start);

    Ok(())
}

/// Test dialogue state serialization
#[test]
fn test_dialogue_state_serialization() -> Result<()> {
    let state = QuizDialogueState::AwaitingUpload {
        path: vec!["A".into(), "B".into(), "C".into(), "Test_1".into()],
        replacing: true,
        language_code: Some("hi".to_string()),
    };

    let json = serde_json::to_string(&state)?;
    assert!(json.contains("AwaitingUpload"));
    assert!(json.contains("Test_1"));

    let restored: QuizDialogueState = serde_json::from_str(&json)?;
    assert_eq!(restored, state);
    assert_eq!(restored.language_code(), Some("hi"));

    Ok(())
}
