//! AI Orchestration Client — turns a narrated experience into structured resume content.
//!
//! Flow per operation:
//!   cache lookup → (miss) retry { build prompt → remote call → parse → normalize }
//!   → cache store → typed result.
//!
//! Every call is all-or-nothing. Callers map `AiError` to a generic
//! "try again" message and never show its detail to end users.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::llm_client::{
    ChatMessage, CompletionRequest, LlmError, TextGenerator, TranscriptionRequest,
};
use crate::models::resume::{InitialResult, RefinementResult};
use crate::validators::ExperienceType;

pub mod cache;
pub mod handlers;
pub mod normalizer;
pub mod parser;
pub mod prompts;
pub mod retry;

use cache::{cache_key, CacheStats, CachedResponse, InMemoryResponseCache, ResponseCache};
use normalizer::{clamp_bullets, normalize};
use parser::{parse_initial, parse_refinement, ParseError};
use prompts::{build_initial_prompt, build_refinement_prompt};
use retry::{with_retries, RetryPolicy};

/// Follow-up questions kept from the model's output.
const QUESTION_COUNT: usize = 3;

/// The two orchestrated operations. Used for cache keys, parse errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GenerateInitial,
    RefineBullets,
    Transcribe,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GenerateInitial => "generate_initial",
            Operation::RefineBullets => "refine_bullets",
            Operation::Transcribe => "transcribe",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("remote generation call failed: {0}")]
    Remote(#[from] LlmError),

    #[error("malformed model output: {0}")]
    Parse(#[from] ParseError),
}

/// Tunables for the orchestration client.
#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub cache_ttl: Duration,
    pub transcription_model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            cache_ttl: cache::DEFAULT_CACHE_TTL,
            transcription_model: "whisper-1".to_string(),
        }
    }
}

impl AiSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
        }
    }
}

/// Orchestration facade. Owns its response cache; cheap to clone.
#[derive(Clone)]
pub struct AiClient {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<dyn ResponseCache>,
    settings: AiSettings,
}

impl AiClient {
    /// Builds a client with a fresh in-memory cache using `settings.cache_ttl`.
    pub fn new(generator: Arc<dyn TextGenerator>, settings: AiSettings) -> Self {
        let cache = Arc::new(InMemoryResponseCache::new(settings.cache_ttl));
        Self::with_cache(generator, cache, settings)
    }

    pub fn with_cache(
        generator: Arc<dyn TextGenerator>,
        cache: Arc<dyn ResponseCache>,
        settings: AiSettings,
    ) -> Self {
        Self {
            generator,
            cache,
            settings,
        }
    }

    /// Generates a title, bullets, skills and follow-up questions for a story.
    /// Cache hits are returned as stored.
    pub async fn generate_initial(
        &self,
        experience_type: ExperienceType,
        experience_text: &str,
    ) -> Result<InitialResult, AiError> {
        let key = cache_key(
            Operation::GenerateInitial,
            &[
                ("experience_type", experience_type.as_str()),
                ("experience_text", experience_text),
            ],
        );

        if let Some(CachedResponse::Initial(hit)) = self.cache.get(&key) {
            info!("Cache hit for {}", Operation::GenerateInitial);
            return Ok(hit);
        }

        let result = with_retries(
            &self.settings.retry_policy(),
            Operation::GenerateInitial,
            move |_| self.initial_attempt(experience_type, experience_text),
        )
        .await?;

        self.cache
            .set(key, CachedResponse::Initial(result.clone()));

        info!(
            "{} produced {} bullets, {} skills, {} questions",
            Operation::GenerateInitial,
            result.bullet_points.len(),
            result.skills.len(),
            result.questions.len()
        );
        Ok(result)
    }

    /// Rewrites the bullets using the story plus the three follow-up answers.
    /// Every returned bullet is at most 150 characters.
    pub async fn refine_bullets(
        &self,
        experience_text: &str,
        answers: &[String; 3],
    ) -> Result<RefinementResult, AiError> {
        let answers_field = format!("{answers:?}");
        let key = cache_key(
            Operation::RefineBullets,
            &[
                ("experience_text", experience_text),
                ("answers", &answers_field),
            ],
        );

        if let Some(CachedResponse::Refinement(hit)) = self.cache.get(&key) {
            info!("Cache hit for {}", Operation::RefineBullets);
            return Ok(hit);
        }

        let result = with_retries(
            &self.settings.retry_policy(),
            Operation::RefineBullets,
            move |_| self.refinement_attempt(experience_text, answers),
        )
        .await?;

        self.cache
            .set(key, CachedResponse::Refinement(result.clone()));

        info!(
            "{} produced {} bullets, {} skills",
            Operation::RefineBullets,
            result.final_bullets.len(),
            result.final_skills.len()
        );
        Ok(result)
    }

    /// Transcribes a recorded story. Single attempt, never cached.
    pub async fn transcribe(
        &self,
        file_name: String,
        content_type: String,
        audio: Vec<u8>,
    ) -> Result<String, AiError> {
        let request = TranscriptionRequest {
            model: self.settings.transcription_model.clone(),
            file_name,
            content_type,
            audio,
        };
        let text = self.generator.transcribe(&request).await?;

        info!(
            "{} produced {} characters from {} audio bytes",
            Operation::Transcribe,
            text.chars().count(),
            request.audio.len()
        );
        Ok(text)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("AI response cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn initial_attempt(
        &self,
        experience_type: ExperienceType,
        experience_text: &str,
    ) -> Result<InitialResult, AiError> {
        let prompt = build_initial_prompt(experience_type, experience_text);
        debug!(
            "{} requesting {} bullets",
            Operation::GenerateInitial,
            prompt.range.label()
        );

        let request = self.completion_request(vec![
            ChatMessage::system(prompt.system),
            ChatMessage::user(prompt.user),
        ]);
        let raw = self.generator.complete(&request).await?;

        let parsed = parse_initial(&raw)?;
        let (bullet_points, skills) = normalize(parsed.bullets, parsed.skills, prompt.range);
        let mut questions = parsed.questions;
        questions.truncate(QUESTION_COUNT);

        Ok(InitialResult {
            title: parsed.title,
            bullet_points,
            skills,
            questions,
        })
    }

    async fn refinement_attempt(
        &self,
        experience_text: &str,
        answers: &[String; 3],
    ) -> Result<RefinementResult, AiError> {
        let prompt = build_refinement_prompt(experience_text, answers);
        debug!(
            "{} requesting {} bullets",
            Operation::RefineBullets,
            prompt.range.label()
        );

        let request = self.completion_request(vec![ChatMessage::system(prompt.system)]);
        let raw = self.generator.complete(&request).await?;

        let parsed = parse_refinement(&raw)?;
        let (bullets, final_skills) = normalize(parsed.bullets, parsed.skills, prompt.range);

        Ok(RefinementResult {
            final_bullets: clamp_bullets(bullets),
            final_skills,
            suggestions: parsed.suggestions,
        })
    }

    fn completion_request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{server_error, ScriptedGenerator};
    use super::*;
    use crate::ai_client::normalizer::{FILLER_BULLETS, FILLER_SKILLS};
    use crate::llm_client::Role;
    use tokio::time::Instant;

    const INITIAL_OUTPUT: &str = "Experience Title:
Food Bank Volunteer

Resume Bullet Points:
- Sorted **2,000 lbs** of donations every week for **8 months**
- Trained **6** new volunteers on intake procedures
- Cut pantry restocking time by **30%** with a shelf labeling system

Skills:
- Inventory Management
- Training
- Process Improvement
- Teamwork
- Organization

Follow-Up Questions:
1. How many families did the food bank serve each week?
2. How long did volunteer training take?
3. How did you measure the restocking time?
4. Did you hold a leadership title?
";

    const REFINEMENT_OUTPUT: &str = "Final Bullet Points:
- Sorted **2,000 lbs** of weekly donations for **8 months**, feeding **150** families
- Trained **6** volunteers in **2-hour** sessions
- Cut restocking time by **30%** through shelf labeling

Updated Skills:
- Inventory Management
- Training
- Process Improvement
- Teamwork
- Organization
- Logistics

Suggestions:
Add the total hours volunteered.
";

    fn story(words: usize) -> String {
        vec!["volunteered"; words].join(" ")
    }

    fn answers() -> [String; 3] {
        [
            "150 families".to_string(),
            "Two hours".to_string(),
            "Timed shifts".to_string(),
        ]
    }

    fn client(generator: Arc<ScriptedGenerator>) -> AiClient {
        AiClient::new(generator, AiSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_initial_parses_and_trims_questions() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());

        let result = ai
            .generate_initial(ExperienceType::VolunteerCommunity, &story(40))
            .await
            .unwrap();

        assert_eq!(result.title, "Food Bank Volunteer");
        assert_eq!(result.bullet_points.len(), 3);
        assert_eq!(result.skills.len(), 5);
        assert_eq!(result.questions.len(), 3);
        assert_eq!(
            result.questions[0],
            "How many families did the food bank serve each week?"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_request_shape() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, 2000);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("Write 3-5 resume bullet points"));
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_story_sparse_output_is_padded() {
        let sparse = "Experience Title:
Choir Section Lead

Resume Bullet Points:
- Led **12** tenors through weekly rehearsals for **1 year**
- Arranged **4** pieces for the spring concert

Skills:
- Leadership
- Music Arrangement
- Communication

Follow-Up Questions:
1. How many people attended the concert?
2. How long did each arrangement take?
3. Did the section size grow?
";
        let generator = Arc::new(ScriptedGenerator::always(sparse));
        let ai = client(generator.clone());
        let text = story(40);

        let result = ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();

        assert!(generator.requests()[0].messages[0]
            .content
            .contains("Write 3-5 resume bullet points"));
        assert!((3..=5).contains(&result.bullet_points.len()));
        assert_eq!(result.bullet_points.len(), 3);
        assert_eq!(result.bullet_points[2], FILLER_BULLETS[2]);
        assert_eq!(result.skills.len(), 5);
        assert_eq!(
            result.skills,
            vec![
                "Leadership",
                "Music Arrangement",
                "Communication",
                FILLER_SKILLS[0],
                FILLER_SKILLS[2],
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_detailed_story_gets_detailed_range() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());

        let result = ai
            .generate_initial(ExperienceType::WorkAchievement, &story(160))
            .await
            .unwrap();

        assert!(generator.requests()[0].messages[0]
            .content
            .contains("Write 5-7 resume bullet points"));
        assert_eq!(result.bullet_points.len(), 5);
        assert_eq!(result.bullet_points[3], FILLER_BULLETS[3]);
        assert_eq!(result.bullet_points[4], FILLER_BULLETS[4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_calls_within_ttl_hit_cache() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        let first = ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        let second = ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        assert_eq!(generator.calls(), 1);
        assert_eq!(first, second);

        tokio::time::advance(Duration::from_secs(300)).await;
        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_type_is_a_different_key() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        ai.generate_initial(ExperienceType::Other, &text).await.unwrap();
        assert_eq!(generator.calls(), 2);
        assert_eq!(ai.cache_stats().total_entries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cache_forces_new_call() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        ai.clear_cache();
        assert_eq!(ai.cache_stats().total_entries, 0);
        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failures_are_retried_with_backoff() {
        let generator = Arc::new(ScriptedGenerator::scripted(
            vec![Err(server_error()), Err(server_error())],
            Some(INITIAL_OUTPUT),
        ));
        let ai = client(generator.clone());
        let start = Instant::now();

        let result = ai.generate_initial(ExperienceType::Hobby, &story(40)).await;

        assert!(result.is_ok());
        assert_eq!(generator.calls(), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3), "waited {waited:?}");
        assert!(waited <= Duration::from_millis(3300), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error_and_cache_nothing() {
        let generator = Arc::new(ScriptedGenerator::scripted(
            vec![Err(server_error()), Err(server_error()), Err(server_error())],
            None,
        ));
        let ai = client(generator.clone());

        let err = ai
            .generate_initial(ExperienceType::Hobby, &story(40))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Remote(LlmError::Api { status: 503, .. })));
        assert_eq!(generator.calls(), 3);
        assert_eq!(ai.cache_stats().total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_output_fails_both_operations() {
        let generator = Arc::new(ScriptedGenerator::always("Sure! Here are some bullets."));
        let ai = client(generator.clone());

        let err = ai
            .generate_initial(ExperienceType::Hobby, &story(40))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AiError::Parse(ParseError::MissingSection {
                operation: Operation::GenerateInitial,
                ..
            })
        ));

        let err = ai.refine_bullets(&story(40), &answers()).await.unwrap_err();
        assert!(matches!(
            err,
            AiError::Parse(ParseError::MissingSection {
                operation: Operation::RefineBullets,
                ..
            })
        ));

        // Each operation used its full attempt budget; nothing was cached.
        assert_eq!(generator.calls(), 6);
        assert_eq!(ai.cache_stats().total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure_then_good_output_succeeds() {
        let generator = Arc::new(ScriptedGenerator::scripted(
            vec![Ok("garbled".to_string())],
            Some(INITIAL_OUTPUT),
        ));
        let ai = client(generator.clone());

        let result = ai.generate_initial(ExperienceType::Hobby, &story(40)).await;
        assert!(result.is_ok());
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refine_bullets_sends_single_system_message() {
        let generator = Arc::new(ScriptedGenerator::always(REFINEMENT_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        let result = ai.refine_bullets(&text, &answers()).await.unwrap();

        assert_eq!(result.final_bullets.len(), 3);
        assert_eq!(result.final_skills.len(), 6);
        assert_eq!(result.suggestions, "Add the total hours volunteered.");

        let request = &generator.requests()[0];
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains(&text));
        assert!(request.messages[0].content.contains("2. Two hours"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refine_bullets_clamps_long_bullets() {
        let long = "x".repeat(220);
        let output = format!(
            "Final Bullet Points:\n- {long}\n- Short one\n- Another\n\nUpdated Skills:\n- A\n- B\n- C\n- D\n- E\n\nSuggestions:\nNone."
        );
        let generator = Arc::new(ScriptedGenerator::always(&output));
        let ai = client(generator);

        let result = ai.refine_bullets(&story(40), &answers()).await.unwrap();

        assert_eq!(result.final_bullets[0].chars().count(), 150);
        assert!(result.final_bullets[0].ends_with("..."));
        assert!(result.final_bullets.iter().all(|b| b.chars().count() <= 150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refine_cache_key_includes_answers() {
        let generator = Arc::new(ScriptedGenerator::always(REFINEMENT_OUTPUT));
        let ai = client(generator.clone());
        let text = story(40);

        ai.refine_bullets(&text, &answers()).await.unwrap();
        ai.refine_bullets(&text, &answers()).await.unwrap();
        assert_eq!(generator.calls(), 1);

        let mut other = answers();
        other[0] = "200 families".to_string();
        ai.refine_bullets(&text, &other).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_cache_is_used() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let cache = Arc::new(InMemoryResponseCache::new(Duration::from_secs(5)));
        let ai = AiClient::with_cache(generator.clone(), cache.clone(), AiSettings::default());
        let text = story(40);

        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        assert_eq!(cache.stats().valid_entries, 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ai.cache_stats().expired_entries, 1);
        ai.generate_initial(ExperienceType::Hobby, &text).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_transcribe_uses_configured_model_without_retrying() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT).with_transcript(
            "I volunteered at the food bank every Saturday.",
        ));
        let ai = client(generator.clone());

        let text = ai
            .transcribe("story.webm".to_string(), "audio/webm".to_string(), vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(text, "I volunteered at the food bank every Saturday.");

        let sent = generator.transcriptions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].model, "whisper-1");
        assert_eq!(sent[0].content_type, "audio/webm");
        assert_eq!(sent[0].audio, vec![1, 2, 3]);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_transcribe_failure_is_single_attempt() {
        let generator = Arc::new(ScriptedGenerator::always(INITIAL_OUTPUT));
        let ai = client(generator.clone());

        let err = ai
            .transcribe("story.wav".to_string(), "audio/wav".to_string(), vec![0; 16])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Remote(LlmError::EmptyContent)));
        assert_eq!(generator.transcriptions().len(), 1);
    }
}
