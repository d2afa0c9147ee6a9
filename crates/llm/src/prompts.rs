//! Prompt templates for summarization and translation

use crate::types::LanguageCode;

/// Built-in summarization instruction, written in English
pub const DEFAULT_PROMPT: &str = "Summarize the text concisely and directly without prefatory phrases. Focus on presenting its key points and main ideas, ensuring that essential details are accurately conveyed in a straightforward manner.";

/// Content fenced in backticks, followed by the instruction
pub fn stuff_prompt(context: &str, instruction: &str) -> String {
    format!("```{}```\n{}", context, instruction)
}

/// Instruction asking the model to translate the fenced text
pub fn translation_instruction(target: &LanguageCode) -> String {
    format!(
        "Translate the text above into {} ({}). Reply with the translation only, without quotes, notes or any other commentary.",
        language_name(target),
        target
    )
}

/// English name of a language code, or the code itself when unknown
pub fn language_name(code: &LanguageCode) -> &str {
    match code.as_str() {
        "en" => "English",
        "nl" => "Dutch",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "pl" => "Polish",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        "tr" => "Turkish",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuff_prompt_layout() {
        assert_eq!(stuff_prompt("body", "Summarize."), "```body```\nSummarize.");
    }

    #[test]
    fn test_translation_instruction_names_language() {
        let instruction = translation_instruction(&LanguageCode::new("nl"));
        assert!(instruction.contains("Dutch (nl)"));
    }

    #[test]
    fn test_unknown_language_name_falls_back_to_code() {
        assert_eq!(language_name(&LanguageCode::new("epo")), "epo");
    }
}
