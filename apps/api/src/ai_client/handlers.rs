//! Axum route handlers for the experience workflow and cache introspection.
//!
//! Raw JSON is turned into validated request models before anything reaches
//! `AiClient`.

use std::time::{Duration, Instant};

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::ai_client::cache::CacheStats;
use crate::ai_client::{AiError, Operation};
use crate::errors::AppError;
use crate::models::resume::{ExperienceRequest, InitialResult, RefinementRequest};
use crate::state::AppState;
use crate::validators::{
    sanitize_bullets_for_save, sanitize_text, validate_audio_upload, validate_bullets_list,
    ExperienceType,
};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub experience_type: String,
    #[serde(default)]
    pub experience_text: String,
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    #[serde(default)]
    pub experience_text: String,
    #[serde(default)]
    pub answers: Vec<String>,
    /// Extra detail from the user, appended to the story on a new line.
    pub improvement: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefineResponse {
    pub final_bullets: Vec<String>,
    pub final_skills: Vec<String>,
    pub suggestions: String,
    /// True when at least one bullet was shortened to fit.
    pub any_truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub title: String,
    pub bullets: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub title: String,
    pub bullets: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/experience/init
///
/// Sanitizes and validates the story, then generates the initial draft.
pub async fn handle_experience_init(
    State(state): State<AppState>,
    Json(request): Json<InitRequest>,
) -> Result<Json<InitialResult>, AppError> {
    let request = ExperienceRequest::from_raw(&request.experience_type, &request.experience_text)?;

    let started = Instant::now();
    let result = state
        .ai
        .generate_initial(request.experience_type, &request.experience_text)
        .await;
    log_ai_call(
        Operation::GenerateInitial,
        Some(request.experience_type),
        &request.experience_text,
        started.elapsed(),
        result.as_ref().err(),
    );

    Ok(Json(result?))
}

/// POST /api/v1/experience/refine
///
/// Refines the bullets with the three follow-up answers. An optional
/// improvement note is appended to the story first.
pub async fn handle_experience_refine(
    State(state): State<AppState>,
    Json(request): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, AppError> {
    let request = RefinementRequest::from_raw(
        &request.experience_text,
        &request.answers,
        request.improvement.as_deref(),
    )?;

    let started = Instant::now();
    let result = state
        .ai
        .refine_bullets(&request.experience_text, &request.answers)
        .await;
    log_ai_call(
        Operation::RefineBullets,
        None,
        &request.experience_text,
        started.elapsed(),
        result.as_ref().err(),
    );
    let result = result?;

    let (final_bullets, any_truncated) = validate_bullets_list(&result.final_bullets);
    Ok(Json(RefineResponse {
        final_bullets,
        final_skills: result.final_skills,
        suggestions: result.suggestions,
        any_truncated,
    }))
}

/// POST /api/v1/experience/finalize
///
/// Cleans user-edited content so it is ready to save.
pub async fn handle_experience_finalize(
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let title = sanitize_text(&request.title);
    if title.is_empty() {
        return Err(AppError::Validation("Please provide a title.".to_string()));
    }

    let bullets = sanitize_bullets_for_save(&request.bullets);
    if bullets.is_empty() {
        return Err(AppError::Validation(
            "Please provide at least one bullet point.".to_string(),
        ));
    }

    let skills = request
        .skills
        .iter()
        .map(|s| sanitize_text(s))
        .filter(|s| !s.is_empty())
        .collect();

    Ok(Json(FinalizeResponse {
        title,
        bullets,
        skills,
    }))
}

/// POST /api/v1/experience/transcribe
///
/// Accepts a multipart form with one `audio` file (WebM, WAV or MP3, at most
/// 10MB) and returns its transcript for the user to review as their story.
pub async fn handle_transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("audio") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let audio = field.bytes().await.map_err(upload_error)?;
        let media_type =
            validate_audio_upload(file_name.as_deref(), content_type.as_deref(), audio.len())?;

        let started = Instant::now();
        let audio_bytes = audio.len();
        let result = state
            .ai
            .transcribe(
                file_name.unwrap_or_default(),
                media_type.to_string(),
                audio.to_vec(),
            )
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        return match result {
            Ok(text) => {
                info!(
                    operation = %Operation::Transcribe,
                    audio_bytes,
                    elapsed_ms,
                    success = true,
                    "AI call completed"
                );
                Ok(Json(TranscribeResponse { text }))
            }
            Err(e) => {
                warn!(
                    operation = %Operation::Transcribe,
                    audio_bytes,
                    elapsed_ms,
                    success = false,
                    error = %e,
                    "AI call failed"
                );
                Err(e.into())
            }
        };
    }

    Err(AppError::Validation("No audio file provided".to_string()))
}

fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation("Audio file too large. Maximum size is 10MB.".to_string())
    } else {
        AppError::Validation("Could not read the audio upload.".to_string())
    }
}

/// GET /api/v1/ai/cache
pub async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.ai.cache_stats())
}

/// DELETE /api/v1/ai/cache
pub async fn handle_cache_clear(State(state): State<AppState>) -> StatusCode {
    state.ai.clear_cache();
    StatusCode::NO_CONTENT
}

/// Hex SHA-256 of the sanitized story. Lets repeated submissions be
/// correlated in logs without logging the story itself.
fn text_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// One structured audit event per AI call. The story itself is never logged.
fn log_ai_call(
    operation: Operation,
    experience_type: Option<ExperienceType>,
    text: &str,
    elapsed: Duration,
    error: Option<&AiError>,
) {
    let experience_type = experience_type.map(ExperienceType::as_str).unwrap_or("-");
    let text_length = text.chars().count();
    let text_hash = text_hash(text);
    let elapsed_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(
            operation = %operation,
            experience_type,
            text_length,
            %text_hash,
            elapsed_ms,
            success = true,
            "AI call completed"
        ),
        Some(e) => warn!(
            operation = %operation,
            experience_type,
            text_length,
            %text_hash,
            elapsed_ms,
            success = false,
            error = %e,
            "AI call failed"
        ),
    }
}
