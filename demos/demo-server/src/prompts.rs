//! Demo prompts.

use dispatchkit::prelude::*;
use std::collections::BTreeMap;

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_prompt(
        PromptDefinition::new("generate_code_request")
            .description("Generates a user message requesting code generation.")
            .param(ParameterSpec::string("language"))
            .param(ParameterSpec::string("task_description")),
        generate_code_request,
    )?;

    registry.register_prompt(
        PromptDefinition::new("analyze_data")
            .description("Analyze numerical data.")
            .param(ParameterSpec::new("numbers", ParamType::array(ParamType::Integer)).min_length(1))
            .param(ParameterSpec::new("metadata", ParamType::map(ParamType::String)))
            .param(ParameterSpec::number("threshold")),
        analyze_data,
    )?;

    registry.register_prompt(
        PromptDefinition::new("roleplay_scenario")
            .description("Sets up a roleplaying scenario with initial messages.")
            .param(ParameterSpec::string("character"))
            .param(ParameterSpec::string("situation")),
        roleplay_scenario,
    )?;

    Ok(())
}

async fn generate_code_request(args: Arguments, _ctx: Context) -> Result<Message, HandlerError> {
    let language: String = args.get("language")?;
    let task: String = args.get("task_description")?;
    Ok(Message::user(format!(
        "Write a {language} function that performs the following task: {task}"
    )))
}

async fn analyze_data(args: Arguments, _ctx: Context) -> Result<String, HandlerError> {
    let numbers: Vec<i64> = args.get("numbers")?;
    let metadata: BTreeMap<String, String> = args.get("metadata")?;
    let threshold: f64 = args.get("threshold")?;
    tracing::debug!(count = numbers.len(), metadata = ?metadata, "Analyzing");

    let avg = numbers.iter().sum::<i64>() as f64 / numbers.len() as f64;
    Ok(format!("Average: {avg}, above threshold: {}", avg > threshold))
}

async fn roleplay_scenario(args: Arguments, _ctx: Context) -> Result<Vec<Message>, HandlerError> {
    let character: String = args.get("character")?;
    let situation: String = args.get("situation")?;
    Ok(vec![
        Message::user(format!(
            "Let's roleplay. You are {character}. The situation is: {situation}"
        )),
        Message::assistant("Okay, I understand. I am ready. What happens next?"),
    ])
}
