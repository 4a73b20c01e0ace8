//! End-to-end scenarios for the planning pipeline
//!
//! Each test drives a public entry point the way a host would: parse or
//! validate a raw model answer, then build the plan.

use serde_json::json;
use teams_ai::augmentations::{enable_submit_mode, is_submit_mode, SUBMIT_TOOL_OUTPUTS_MAP};
use teams_ai::{
    ActionCall, ActionResponseValidator, Augmentation, ChatCompletionAction, Command,
    GptTokenizer, Memory, Message, MonologueAugmentation, PromptResponse, ResponseParser, Role,
    SequenceAugmentation, ToolsAugmentation, TurnMemory,
};

fn lights_actions() -> Vec<ChatCompletionAction> {
    vec![
        ChatCompletionAction::new("lights_on")
            .unwrap()
            .with_description("Turn the lights on")
            .with_parameters(json!({
                "type": "object",
                "properties": {"room": {"type": "string"}},
                "required": ["room"]
            })),
        ChatCompletionAction::new("lights_off")
            .unwrap()
            .with_description("Turn the lights off"),
    ]
}

// ===== Scenario A: free-text DO command =====

#[test]
fn test_free_text_do_command() {
    let plan = ResponseParser::new().parse_response("DO action foo=\"bar\"");

    assert_eq!(
        serde_json::to_value(&plan).unwrap(),
        json!({
            "type": "plan",
            "commands": [{"type": "DO", "action": "action", "parameters": {"foo": "bar"}}]
        })
    );
}

#[test]
fn test_free_text_do_then_say() {
    let plan = ResponseParser::new()
        .parse_response("DO lights_on room=\"kitchen\" THEN SAY The kitchen lights are on.");

    match &plan.commands[..] {
        [Command::Do(do_command), Command::Say(say)] => {
            assert_eq!(do_command.action, "lights_on");
            assert_eq!(do_command.parameters["room"], "kitchen");
            assert_eq!(say.text(), "The kitchen lights are on.");
            assert!(!say.text().contains("THEN"));
        }
        other => panic!("Expected DO then SAY, got {:?}", other),
    }
}

#[test]
fn test_embedded_json_plan_used_verbatim() {
    let embedded = json!({
        "type": "plan",
        "commands": [
            {"type": "DO", "action": "lights_off", "parameters": {}},
            {"type": "SAY", "response": {"role": "assistant", "content": "Lights off."}}
        ]
    });
    let text = format!("Okay! Here's what I'll do:\n{}\nSAY something else", embedded);

    let plan = ResponseParser::new().parse_response(&text);
    assert_eq!(serde_json::to_value(&plan).unwrap(), embedded);
}

#[test]
fn test_case_different_duplicate_say_collapsed() {
    let plan = ResponseParser::new().parse_response("SAY Good morning! SAY good MORNING!");
    assert_eq!(plan.commands.len(), 1);
}

// ===== Scenario B: monologue SAY =====

#[tokio::test]
async fn test_monologue_say() {
    let augmentation = MonologueAugmentation::new(lights_actions()).unwrap();
    let memory = TurnMemory::new();
    let tokenizer = GptTokenizer::new().unwrap();
    let response = PromptResponse::success(Message::assistant(
        json!({
            "thoughts": {
                "thought": "The user greeted me",
                "reasoning": "Greeting back is polite",
                "plan": "- say hi"
            },
            "action": {"name": "SAY", "parameters": {"text": "hi"}}
        })
        .to_string(),
    ));

    let validation = augmentation
        .validate_response(&memory, &tokenizer, &response, 3)
        .await;
    assert!(validation.is_valid());

    let plan = augmentation
        .create_plan_from_response(&memory, response.with_content(validation.into_value().unwrap()))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&plan).unwrap(),
        json!({
            "type": "plan",
            "commands": [{"type": "SAY", "response": {"role": "assistant", "content": "hi"}}]
        })
    );
}

// ===== Scenario C: sequence DO without an action =====

#[tokio::test]
async fn test_sequence_missing_do_action() {
    let augmentation = SequenceAugmentation::new(lights_actions()).unwrap();
    let response = PromptResponse::success(Message::assistant(
        r#"{"type":"plan","commands":[{"type":"DO","parameters":{"room":"den"}}]}"#,
    ));

    let validation = augmentation
        .validate_response(&TurnMemory::new(), &GptTokenizer::new().unwrap(), &response, 1)
        .await;
    assert_eq!(
        validation.feedback(),
        Some("The plan JSON is missing the DO \"action\" for command[0]. Return the name of the action to DO.")
    );
}

#[tokio::test]
async fn test_sequence_round_trip_stays_valid() {
    let augmentation = SequenceAugmentation::new(lights_actions()).unwrap();
    let memory = TurnMemory::new();
    let tokenizer = GptTokenizer::new().unwrap();
    let response = PromptResponse::success(Message::assistant(
        r#"Sure: {"type":"plan","commands":[{"type":"DO","action":"lights_on","parameters":{"room":"den"}},{"type":"SAY","response":"Done"}]}"#,
    ));

    let value = augmentation
        .validate_response(&memory, &tokenizer, &response, 0)
        .await
        .into_value()
        .unwrap();
    let plan = augmentation
        .create_plan_from_response(&memory, response.with_content(value))
        .await
        .unwrap();

    let again = PromptResponse::success(Message::assistant(serde_json::to_string(&plan).unwrap()));
    let revalidated = augmentation
        .validate_response(&memory, &tokenizer, &again, 0)
        .await;
    assert_eq!(revalidated.into_value(), Some(plan));
}

// ===== Scenario D: unknown action =====

#[test]
fn test_action_validator_unknown_action() {
    let validator = ActionResponseValidator::new(lights_actions(), true);
    let validation = validator.validate_action("open_garage", &json!({}));

    assert!(!validation.is_valid());
    assert!(validation.feedback().unwrap().contains("\"open_garage\""));
}

#[test]
fn test_action_validator_revalidation_is_stable() {
    let validator = ActionResponseValidator::new(lights_actions(), true);
    let first = validator
        .validate_action("lights_on", &json!({"room": "hall"}))
        .into_value()
        .unwrap();

    let second = validator
        .validate_action(&first.name, &serde_json::Value::Object(first.parameters.clone()))
        .into_value()
        .unwrap();
    assert_eq!(first, second);
}

// ===== Scenario E: tools with nothing usable =====

#[tokio::test]
async fn test_tools_zero_valid_calls() {
    let augmentation = ToolsAugmentation::new(lights_actions());
    let memory = TurnMemory::new();
    let tokenizer = GptTokenizer::new().unwrap();
    enable_submit_mode(&memory);
    memory.set_value(SUBMIT_TOOL_OUTPUTS_MAP, json!({"call_0": "lights_off"}));

    let response = PromptResponse::success(
        Message::empty(Role::Assistant)
            .with_action_calls(vec![ActionCall::new("call_1", "open_garage", "{}")]),
    );
    let content = augmentation
        .validate_response(&memory, &tokenizer, &response, 0)
        .await
        .into_value()
        .unwrap();
    let plan = augmentation
        .create_plan_from_response(&memory, response.with_content(content))
        .await
        .unwrap();

    assert!(plan.commands.is_empty());
    assert!(!is_submit_mode(&memory));
    assert!(!memory.has_value(SUBMIT_TOOL_OUTPUTS_MAP));
}
