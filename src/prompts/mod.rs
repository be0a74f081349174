//! LLM prompts for the app generation pipeline.
//!
//! One builder per pipeline stage kind: name selection, architecture
//! planning, and file generation. The file-generation prompt instructs the
//! model to answer with a `{"filename": ..., "content": ...}` JSON object;
//! the extractor in [`crate::utils::response_extraction`] tolerates models
//! that ignore that instruction.

/// System prompt used for every model invocation.
pub const SYSTEM_PROMPT: &str = "You are an expert Android app developer. When asked to modify a \
     file, respond ONLY in raw JSON with keys 'filename' and 'content'. No prose.";

/// Instruction template for generating a full replacement file.
pub const FILE_INSTRUCTION: &str = "Given the existing file content, produce a JSON with filename \
     and full replacement content. Return ONLY valid JSON: {\"filename\":..., \"content\":...}. \
     Target a production-ready Android implementation that matches the app idea.";

/// Build the instruction asking for a short app name.
pub fn name_instruction(idea: &str) -> String {
    format!(
        "Choose a short, friendly Android app name for this idea. \
         Respond ONLY with the name.\n\nIdea:{idea}"
    )
}

/// Build the instruction asking for an architecture plan.
pub fn plan_instruction(idea: &str, app_name: &str) -> String {
    format!(
        "Design a simple, clean architecture for an Android app using Kotlin and XML. \
         List the files to implement with brief purpose. Keep it minimal.\
         \n\nApp: {app_name}\nIdea: {idea}"
    )
}

/// Build the full user prompt for one file-generation stage.
///
/// Layers the fixed instruction, the app idea, the stage's selected context
/// from earlier outputs, and the current content of the target file.
pub fn file_prompt(idea: &str, context: &str, existing: &str) -> String {
    let mut prompt = format!("{FILE_INSTRUCTION}\n\nApp idea:\n{idea}");
    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt.push_str("\n\nExisting content:\n");
    prompt.push_str(existing);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_instruction_carries_the_idea() {
        let instruction = name_instruction("A shopping list app");
        assert!(instruction.contains("Respond ONLY with the name"));
        assert!(instruction.ends_with("Idea:A shopping list app"));
    }

    #[test]
    fn plan_instruction_carries_name_and_idea() {
        let instruction = plan_instruction("A shopping list app", "ShopList");
        assert!(instruction.contains("App: ShopList"));
        assert!(instruction.contains("Idea: A shopping list app"));
    }

    #[test]
    fn file_prompt_layers_all_sections_in_order() {
        let prompt = file_prompt("idea text", "Architecture plan:\nplan text", "old content");
        let instruction_pos = prompt.find("produce a JSON").expect("instruction");
        let idea_pos = prompt.find("idea text").expect("idea");
        let context_pos = prompt.find("plan text").expect("context");
        let existing_pos = prompt.find("old content").expect("existing");
        assert!(instruction_pos < idea_pos);
        assert!(idea_pos < context_pos);
        assert!(context_pos < existing_pos);
    }

    #[test]
    fn file_prompt_omits_empty_context() {
        let prompt = file_prompt("idea", "", "");
        assert!(!prompt.contains("\n\n\n"));
        assert!(prompt.ends_with("Existing content:\n"));
    }
}
