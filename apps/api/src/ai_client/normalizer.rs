//! Count/Length Normalizer — clamps model output to the requested shape.
//!
//! The model is asked for a bullet/skill range but is not trusted to honor it.
//! Padding uses fixed generic text; truncation keeps the first N items.

use crate::ai_client::prompts::{BulletRange, SKILL_MAX, SKILL_MIN};
use crate::validators::validate_bullet;

/// Generic bullets appended when the model returns too few.
pub const FILLER_BULLETS: &[&str] = &[
    "Demonstrated strong work ethic and commitment to achieving goals.",
    "Successfully completed assigned tasks within established deadlines.",
    "Maintained high quality standards throughout the project duration.",
    "Collaborated effectively with team members to achieve objectives.",
    "Adapted quickly to changing requirements and priorities.",
];

/// Generic skills appended when the model returns too few.
pub const FILLER_SKILLS: &[&str] = &[
    "Problem Solving",
    "Communication",
    "Teamwork",
    "Adaptability",
    "Time Management",
];

/// Pads or truncates bullets to `range` and skills to `SKILL_MIN..=SKILL_MAX`.
///
/// Filler bullets are picked by the current list length, cycling through
/// `FILLER_BULLETS`. Filler skills skip anything already present.
pub fn normalize(
    mut bullets: Vec<String>,
    mut skills: Vec<String>,
    range: BulletRange,
) -> (Vec<String>, Vec<String>) {
    if bullets.len() < range.min {
        while bullets.len() < range.min {
            let filler = FILLER_BULLETS[bullets.len() % FILLER_BULLETS.len()];
            bullets.push(filler.to_string());
        }
    } else {
        bullets.truncate(range.max);
    }

    if skills.len() < SKILL_MIN {
        for filler in FILLER_SKILLS {
            if skills.len() >= SKILL_MIN {
                break;
            }
            if !skills.iter().any(|s| s.eq_ignore_ascii_case(filler)) {
                skills.push(filler.to_string());
            }
        }
    } else {
        skills.truncate(SKILL_MAX);
    }

    (bullets, skills)
}

/// Applies the per-bullet character ceiling, dropping bullets that end up empty.
pub fn clamp_bullets(bullets: Vec<String>) -> Vec<String> {
    bullets
        .iter()
        .map(|b| validate_bullet(b).0)
        .filter(|b| !b.is_empty())
        .collect()
}
