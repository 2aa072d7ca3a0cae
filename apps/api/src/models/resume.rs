use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::validators::{sanitize_text, validate_answer, validate_story, ExperienceType};

/// A sanitized, validated experience story, ready for initial generation.
/// Only constructible through [`ExperienceRequest::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceRequest {
    pub experience_type: ExperienceType,
    pub experience_text: String,
}

impl ExperienceRequest {
    pub fn from_raw(experience_type: &str, experience_text: &str) -> Result<Self, AppError> {
        if experience_type.trim().is_empty() || experience_text.trim().is_empty() {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }

        let experience_type: ExperienceType = sanitize_text(experience_type).parse()?;
        let experience_text = sanitize_text(experience_text);
        validate_story(&experience_text)?;

        Ok(Self {
            experience_type,
            experience_text,
        })
    }
}

/// Output of initial generation.
///
/// Bullet count is 3..=7 and skill count is 5..=7 after normalization.
/// `questions` holds the model's follow-ups (three are requested).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialResult {
    pub title: String,
    pub bullet_points: Vec<String>,
    pub skills: Vec<String>,
    pub questions: Vec<String>,
}

/// A story plus the user's answers to the three follow-up questions.
/// Only constructible through [`RefinementRequest::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementRequest {
    pub experience_text: String,
    pub answers: [String; 3],
}

impl RefinementRequest {
    /// Sanitizes and validates the story and answers. An `improvement` that
    /// is blank after sanitizing is ignored. Otherwise it is validated like an
    /// answer and appended to the story on its own line, and the combined
    /// story must still satisfy the story bounds.
    pub fn from_raw(
        experience_text: &str,
        answers: &[String],
        improvement: Option<&str>,
    ) -> Result<Self, AppError> {
        let mut experience_text = sanitize_text(experience_text);
        validate_story(&experience_text)?;

        let answers: [String; 3] = answers
            .iter()
            .map(|a| sanitize_text(a))
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| {
                AppError::Validation("Please answer all follow-up questions first.".to_string())
            })?;
        for answer in &answers {
            validate_answer(answer)?;
        }

        if let Some(improvement) = improvement {
            let improvement = sanitize_text(improvement);
            if !improvement.is_empty() {
                validate_answer(&improvement)?;
                experience_text.push('\n');
                experience_text.push_str(&improvement);
                validate_story(&experience_text)?;
            }
        }

        Ok(Self {
            experience_text,
            answers,
        })
    }
}

/// Output of refinement. Every bullet is at most 150 characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub final_bullets: Vec<String>,
    pub final_skills: Vec<String>,
    pub suggestions: String,
}
