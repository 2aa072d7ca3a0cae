// Prompt templates and builders for the resume orchestration client.
// Builders are pure: the retry controller re-runs them on every attempt.

use crate::ai_client::parser::{INITIAL_LAYOUT, REFINEMENT_LAYOUT};
use crate::llm_client::prompts::{
    language_instruction, BULLET_STRUCTURE_INSTRUCTION, LANGUAGE_FINAL_REMINDER,
};
use crate::validators::{word_count, ExperienceType};

/// Stories longer than this many words get the larger bullet range.
const DETAILED_WORD_THRESHOLD: usize = 150;
/// Stories longer than this many characters get the larger bullet range.
const DETAILED_CHAR_THRESHOLD: usize = 800;

pub const SKILL_MIN: usize = 5;
pub const SKILL_MAX: usize = 7;

/// Target bullet count, chosen locally from story length and reused by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletRange {
    pub min: usize,
    pub max: usize,
}

impl BulletRange {
    pub const BRIEF: BulletRange = BulletRange { min: 3, max: 5 };
    pub const DETAILED: BulletRange = BulletRange { min: 5, max: 7 };

    pub fn for_story(experience_text: &str) -> Self {
        let detailed = word_count(experience_text) > DETAILED_WORD_THRESHOLD
            || experience_text.chars().count() > DETAILED_CHAR_THRESHOLD;
        if detailed {
            Self::DETAILED
        } else {
            Self::BRIEF
        }
    }

    /// The "3-5" style label injected into prompts.
    pub fn label(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }
}

/// Initial generation prompt, sent as the system message.
/// Replace: {experience_type}, {language_instruction}, {bullet_range}, {bullet_min},
///          {bullet_max}, {bullet_structure}, {skill_min}, {skill_max},
///          {title_anchor}, {bullets_anchor}, {skills_anchor}, {questions_anchor},
///          {final_reminder}
pub const INITIAL_PROMPT_TEMPLATE: &str = r#"You are a professional resume strategist and AI assistant. The user will describe one {experience_type} experience.

{language_instruction}

1. Generate a short, smart title for this experience (e.g. "Community Volunteer", "Freelance Designer", "Family Caregiver") in the user's language.

2. Write {bullet_range} resume bullet points (minimum {bullet_min}, maximum {bullet_max}). For each bullet:
{bullet_structure}

IMPORTANT: You MUST generate EXACTLY {bullet_range} bullet points, no more, no less.

3. Extract EXACTLY {skill_min}-{skill_max} relevant skills (minimum {skill_min}, maximum {skill_max}) that the person likely used in this experience. Include both hard and soft skills.

4. Ask 3 targeted follow-up questions based ONLY on what the user wrote, NOT on the bullet points you generated. The questions should:
- Clarify details that are mentioned but unclear (e.g. "You mentioned helping people - how many people were impacted?")
- Ask for specific metrics (e.g. "You mentioned saving time - how much time was saved?")
- Pin down durations that were not specific (e.g. "You mentioned this took a while - how long did it take?")

Keep the questions short and framed to get measurable or time-based answers.

Output format (use these section headers exactly, one item per line):

{title_anchor}
[one-line title]

{bullets_anchor}
- ...
- ...
- ...

{skills_anchor}
- ...
- ...
- ...

{questions_anchor}
1. ...
2. ...
3. ...

{final_reminder}"#;

/// Refinement prompt, sent as a single system message.
/// Replace: {language_instruction}, {experience_text}, {answer_1}, {answer_2}, {answer_3},
///          {bullet_range}, {bullet_min}, {bullet_max}, {bullet_structure}, {skill_min},
///          {skill_max}, {max_bullet_chars}, {bullets_anchor}, {skills_anchor},
///          {suggestions_anchor}, {final_reminder}
pub const REFINEMENT_PROMPT_TEMPLATE: &str = r#"You are a resume builder AI. The user shared their experience and answered 3 follow-up questions about it.
Update and improve the resume bullet points using the original experience together with the follow-up answers.

{language_instruction}

Original experience description:
{experience_text}

Follow-up answers:
1. {answer_1}
2. {answer_2}
3. {answer_3}

Each bullet point:
{bullet_structure}

Output the updated content in this exact format (use these section headers exactly):

{bullets_anchor}
- [improved bullet with specific metrics and impact]
- ...

IMPORTANT: You MUST generate EXACTLY {bullet_range} bullet points (minimum {bullet_min}, maximum {bullet_max}).

{skills_anchor}
- [Skill]
- ...

IMPORTANT: You MUST generate EXACTLY {skill_min}-{skill_max} skills (minimum {skill_min}, maximum {skill_max}).

{suggestions_anchor}
[3-5 specific suggestions for further improvement, focusing on metrics, timeframes, or impact that could be added to the experience description]

IMPORTANT: Each bullet point must be {max_bullet_chars} characters or less.

{final_reminder}"#;

/// A fully rendered initial-generation prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialPrompt {
    pub system: String,
    pub user: String,
    pub range: BulletRange,
}

/// A fully rendered refinement prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementPrompt {
    pub system: String,
    pub range: BulletRange,
}

pub fn build_initial_prompt(
    experience_type: ExperienceType,
    experience_text: &str,
) -> InitialPrompt {
    let range = BulletRange::for_story(experience_text);
    let [title, bullets, skills, questions] = INITIAL_LAYOUT.anchors;

    let system = INITIAL_PROMPT_TEMPLATE
        .replace("{experience_type}", experience_type.label())
        .replace(
            "{language_instruction}",
            &language_instruction("title, bullet points, skills, and follow-up questions"),
        )
        .replace("{bullet_range}", &range.label())
        .replace("{bullet_min}", &range.min.to_string())
        .replace("{bullet_max}", &range.max.to_string())
        .replace("{bullet_structure}", BULLET_STRUCTURE_INSTRUCTION)
        .replace("{skill_min}", &SKILL_MIN.to_string())
        .replace("{skill_max}", &SKILL_MAX.to_string())
        .replace("{title_anchor}", title)
        .replace("{bullets_anchor}", bullets)
        .replace("{skills_anchor}", skills)
        .replace("{questions_anchor}", questions)
        .replace("{final_reminder}", LANGUAGE_FINAL_REMINDER);

    InitialPrompt {
        system,
        user: experience_text.to_string(),
        range,
    }
}

pub fn build_refinement_prompt(experience_text: &str, answers: &[String; 3]) -> RefinementPrompt {
    let range = BulletRange::for_story(experience_text);
    let [bullets, skills, suggestions] = REFINEMENT_LAYOUT.anchors;

    let template = REFINEMENT_PROMPT_TEMPLATE
        .replace(
            "{language_instruction}",
            &language_instruction("bullet points, skills, and suggestions"),
        )
        .replace("{bullet_range}", &range.label())
        .replace("{bullet_min}", &range.min.to_string())
        .replace("{bullet_max}", &range.max.to_string())
        .replace("{bullet_structure}", BULLET_STRUCTURE_INSTRUCTION)
        .replace("{skill_min}", &SKILL_MIN.to_string())
        .replace("{skill_max}", &SKILL_MAX.to_string())
        .replace(
            "{max_bullet_chars}",
            &crate::validators::MAX_BULLET_CHARS.to_string(),
        )
        .replace("{bullets_anchor}", bullets)
        .replace("{skills_anchor}", skills)
        .replace("{suggestions_anchor}", suggestions)
        .replace("{final_reminder}", LANGUAGE_FINAL_REMINDER);

    // User text is filled in one pass so braces inside it are never expanded.
    let system = fill_placeholders(
        &template,
        &[
            ("{answer_1}", answers[0].as_str()),
            ("{answer_2}", answers[1].as_str()),
            ("{answer_3}", answers[2].as_str()),
            ("{experience_text}", experience_text),
        ],
    );

    RefinementPrompt { system, range }
}

/// Replaces each placeholder in `template` with its value. Inserted values
/// are copied verbatim and never rescanned.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|&(key, value)| rest.find(key).map(|at| (at, key, value)))
            .min_by_key(|&(at, _, _)| at);

        match next {
            Some((at, key, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
