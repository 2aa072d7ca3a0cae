// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Opening instruction that forces the model to answer in the user's language.
/// Replace `{outputs}` with the list of artifacts the prompt asks for.
pub const LANGUAGE_MIRROR_INSTRUCTION: &str = "\
CRITICAL LANGUAGE REQUIREMENT - READ THIS FIRST:
You MUST respond in EXACTLY the same language as the user's experience description.
- If the user writes in English, respond in English
- If the user writes in Spanish, respond in Spanish
- If the user writes in French, respond in French
- If the user writes in Korean, respond in Korean
- If the user writes in any other language, respond in that same language

DO NOT switch languages. DO NOT translate. Use the EXACT same language as the input.
This applies to ALL outputs: {outputs}.";

/// Closing reminder appended to every prompt that carries the language rule.
pub const LANGUAGE_FINAL_REMINDER: &str =
    "FINAL REMINDER: Use the EXACT same language as the user's input. DO NOT translate or switch languages.";

/// Common bullet-writing structure used by both generation and refinement.
pub const BULLET_STRUCTURE_INSTRUCTION: &str = "\
- Start each bullet with a strong action verb (e.g. Led, Created, Designed, Improved)
- State what was done and how it was done
- State the result or achievement, preferably with measurable data or impact
- State how long it took (duration)
- Bold any key metrics or quantifiable results (e.g. **20%**, **$500**, **2 months**)";

/// Renders the language instruction for a specific set of outputs.
pub fn language_instruction(outputs: &str) -> String {
    LANGUAGE_MIRROR_INSTRUCTION.replace("{outputs}", outputs)
}
