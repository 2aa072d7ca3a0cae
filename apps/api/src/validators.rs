//! Text sanitizing and validation for user input and model output.
//!
//! Upstream checks (`validate_story`, `validate_answer`, `ExperienceType`)
//! run in handlers before anything reaches `ai_client`. Bullet clamping is
//! shared with the orchestration core.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Hard ceiling for one resume bullet, in characters.
pub const MAX_BULLET_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

pub const MIN_STORY_CHARS: usize = 80;
pub const MAX_STORY_CHARS: usize = 2000;
pub const MIN_STORY_WORDS: usize = 30;
pub const MAX_ANSWER_CHARS: usize = 500;

pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;
pub const AUDIO_CONTENT_TYPES: [&str; 3] = ["audio/webm", "audio/wav", "audio/mpeg"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SCRIPT_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(javascript|vbscript):").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ────────────────────────────────────────────────────────────────────────────
// Experience type
// ────────────────────────────────────────────────────────────────────────────

/// The kind of experience the user is describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceType {
    WorkAchievement,
    AcademicProject,
    VolunteerCommunity,
    PersonalChallenge,
    Hobby,
    Other,
}

impl ExperienceType {
    pub const ALL: [ExperienceType; 6] = [
        ExperienceType::WorkAchievement,
        ExperienceType::AcademicProject,
        ExperienceType::VolunteerCommunity,
        ExperienceType::PersonalChallenge,
        ExperienceType::Hobby,
        ExperienceType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceType::WorkAchievement => "work_achievement",
            ExperienceType::AcademicProject => "academic_project",
            ExperienceType::VolunteerCommunity => "volunteer_community",
            ExperienceType::PersonalChallenge => "personal_challenge",
            ExperienceType::Hobby => "hobby",
            ExperienceType::Other => "other",
        }
    }

    /// Human wording used inside prompts.
    pub fn label(self) -> &'static str {
        match self {
            ExperienceType::WorkAchievement => "work achievement",
            ExperienceType::AcademicProject => "academic project",
            ExperienceType::VolunteerCommunity => "volunteer or community",
            ExperienceType::PersonalChallenge => "personal challenge",
            ExperienceType::Hobby => "hobby",
            ExperienceType::Other => "life",
        }
    }
}

impl fmt::Display for ExperienceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::Validation(
                "Please select an experience type.".to_string(),
            ));
        }
        ExperienceType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| AppError::Validation("Please select a valid experience type.".to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sanitizing
// ────────────────────────────────────────────────────────────────────────────

/// Cleans raw user text: HTML-escapes it, strips residual tags and script
/// schemes, and collapses whitespace.
pub fn sanitize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let escaped = escape_html(text);
    let without_tags = TAG_RE.replace_all(&escaped, "");
    let without_scripts = SCRIPT_SCHEME_RE.replace_all(&without_tags, "");
    let collapsed = WHITESPACE_RE.replace_all(&without_scripts, " ");

    collapsed.trim().to_string()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Bullets
// ────────────────────────────────────────────────────────────────────────────

/// Trims a bullet and clamps it to `MAX_BULLET_CHARS` characters.
/// Returns the clamped text and whether truncation happened.
pub fn validate_bullet(text: &str) -> (String, bool) {
    let text = text.trim();
    if text.chars().count() <= MAX_BULLET_CHARS {
        return (text.to_string(), false);
    }

    let keep = MAX_BULLET_CHARS - ELLIPSIS.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    (truncated, true)
}

/// Clamps every bullet. The flag is true if any bullet was shortened.
pub fn validate_bullets_list(bullets: &[String]) -> (Vec<String>, bool) {
    let mut any_truncated = false;
    let processed = bullets
        .iter()
        .map(|b| {
            let (text, truncated) = validate_bullet(b);
            any_truncated |= truncated;
            text
        })
        .collect();
    (processed, any_truncated)
}

/// Sanitizes user-edited bullets before they are saved. Empty bullets are dropped.
pub fn sanitize_bullets_for_save(bullets: &[String]) -> Vec<String> {
    bullets
        .iter()
        .filter(|b| !b.trim().is_empty())
        .map(|b| validate_bullet(&sanitize_text(b)).0)
        .filter(|b| !b.is_empty())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Story / answers
// ────────────────────────────────────────────────────────────────────────────

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Validates the experience story before it is sent for generation.
pub fn validate_story(text: &str) -> Result<(), AppError> {
    let text = text.trim();

    if text.is_empty() {
        return Err(AppError::Validation(
            "Please provide your experience story.".to_string(),
        ));
    }

    let chars = text.chars().count();
    if chars < MIN_STORY_CHARS {
        return Err(AppError::Validation(format!(
            "Please write at least {MIN_STORY_CHARS} characters about your experience."
        )));
    }
    if chars > MAX_STORY_CHARS {
        return Err(AppError::Validation(format!(
            "Please keep your experience description under {MAX_STORY_CHARS} characters."
        )));
    }
    if word_count(text) < MIN_STORY_WORDS {
        return Err(AppError::Validation(
            "Please write a bit more. Try to share at least 3-4 full sentences about your experience."
                .to_string(),
        ));
    }

    Ok(())
}

/// Validates one follow-up answer.
pub fn validate_answer(text: &str) -> Result<(), AppError> {
    let text = text.trim();

    if text.is_empty() {
        return Err(AppError::Validation("Please provide an answer.".to_string()));
    }
    if text.chars().count() > MAX_ANSWER_CHARS {
        return Err(AppError::Validation(format!(
            "Please keep your answer under {MAX_ANSWER_CHARS} characters."
        )));
    }

    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Audio uploads
// ────────────────────────────────────────────────────────────────────────────

/// Checks a recorded-story upload. Returns the accepted media type without
/// parameters, e.g. `audio/webm` for `audio/webm;codecs=opus`.
pub fn validate_audio_upload(
    file_name: Option<&str>,
    content_type: Option<&str>,
    size: usize,
) -> Result<&'static str, AppError> {
    if file_name.map_or(true, |name| name.trim().is_empty()) {
        return Err(AppError::Validation("No audio file selected".to_string()));
    }

    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let media_type = AUDIO_CONTENT_TYPES
        .into_iter()
        .find(|allowed| *allowed == essence)
        .ok_or_else(|| {
            AppError::Validation(
                "Unsupported audio format. Please use WebM, WAV, or MP3.".to_string(),
            )
        })?;

    if size == 0 {
        return Err(AppError::Validation("The audio file is empty.".to_string()));
    }
    if size > MAX_AUDIO_BYTES {
        return Err(AppError::Validation(
            "Audio file too large. Maximum size is 10MB.".to_string(),
        ));
    }

    Ok(media_type)
}
