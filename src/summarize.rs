use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::VideoId;
use crate::error::GenerateError;
use crate::llm::Generator;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a gifted teacher who summarizes video transcripts for students. \
Use very simple words and short sentences so that a 10-year-old could follow without watching the video. \
Format the answer as Markdown with ## section headers (Video Overview, Summary, Main Ideas, Why This Matters, Try This) \
and bullet points. Do not use HTML tags. Keep it under 750 words.";

const NO_TRANSCRIPT_SYSTEM_PROMPT: &str = "You write short study notes about YouTube videos. \
You have NOT seen the video and have no transcript. Everything you write must be inferred from the title alone.";

const NO_TRANSCRIPT_DISCLAIMER: &str = "> **Note:** No transcript was available for this video. \
This summary is inferred from the video title only and is not based on the actual video content.";

const FLASHCARD_SYSTEM_PROMPT: &str = "Create exactly 5 high-quality flashcards from the video transcript. \
The front is a clear, concise question testing a key concept; the back is a specific, accurate answer with a brief example if helpful. \
Output ONLY a JSON object of the form {\"flashcards\": [{\"front\": \"...\", \"back\": \"...\"}]}.";

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant knowledgeable about the content of a specific YouTube video. \
Use ONLY the provided transcript to answer the user's question accurately and concisely. \
If the answer isn't in the transcript, say \"I couldn't find information about that in the video transcript.\"";

/// Stand-in transcript handed to chat when nothing could be fetched
pub const TRANSCRIPT_UNAVAILABLE: &str = "Transcript unavailable.";

/// Summarize a fetched transcript
pub async fn summarize(
    generator: &dyn Generator,
    title: &str,
    transcript_text: &str,
    cancel: &CancellationToken,
) -> Result<String, GenerateError> {
    let user_message = format!("Summarize this transcript from the video \"{title}\":\n\n---\n{transcript_text}\n---");
    generator.generate(SUMMARY_SYSTEM_PROMPT, &user_message, cancel).await
}

/// Summarize a video nobody could get a transcript for.
///
/// The returned text always opens with a disclaimer that it was inferred from
/// the title, whatever the model produced.
pub async fn summarize_without_transcript(
    generator: &dyn Generator,
    video_id: &VideoId,
    title: &str,
    cancel: &CancellationToken,
) -> Result<String, GenerateError> {
    debug!("Generating title-only summary for {video_id}");
    let user_message = format!(
        "The YouTube video {video_id} is titled \"{title}\". Its transcript could not be retrieved. \
Write a brief overview of what a video with this title most likely covers, as a few Markdown bullet points. \
State clearly that this is a guess based only on the title."
    );
    let body = generator
        .generate(NO_TRANSCRIPT_SYSTEM_PROMPT, &user_message, cancel)
        .await?;
    Ok(format!("{NO_TRANSCRIPT_DISCLAIMER}\n\n{}", body.trim()))
}

/// A single question/answer card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FlashcardError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("model returned invalid flashcard data: {0}")]
    InvalidData(String),
}

/// Generate flashcards from a transcript
pub async fn generate_flashcards(
    generator: &dyn Generator,
    transcript_text: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Flashcard>, FlashcardError> {
    let user_message = format!("Video transcript:\n---\n{transcript_text}\n---");
    let raw = generator
        .generate_json(FLASHCARD_SYSTEM_PROMPT, &user_message, cancel)
        .await?;
    parse_flashcards(&raw)
}

#[derive(Deserialize)]
struct FlashcardPayload {
    flashcards: Vec<Flashcard>,
}

fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, FlashcardError> {
    let json = strip_code_fence(raw);
    let payload: FlashcardPayload =
        serde_json::from_str(json).map_err(|e| FlashcardError::InvalidData(e.to_string()))?;
    if payload.flashcards.is_empty() {
        return Err(FlashcardError::InvalidData("no flashcards".to_string()));
    }
    Ok(payload.flashcards)
}

/// Models like to wrap JSON in ```json fences even when told not to
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Answer a question about a video from its transcript
pub async fn answer_question(
    generator: &dyn Generator,
    transcript_text: &str,
    question: &str,
    cancel: &CancellationToken,
) -> Result<String, GenerateError> {
    let user_message = format!("Transcript:\n---\n{transcript_text}\n---\n\nUser Question: {question}\n\nAnswer:");
    generator.generate(CHAT_SYSTEM_PROMPT, &user_message, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Generator for Echo {
        async fn generate(&self, _system: &str, user: &str, _cancel: &CancellationToken) -> Result<String, GenerateError> {
            Ok(format!("  {user}  "))
        }
    }

    #[test]
    fn test_parse_flashcards() {
        let raw = r#"{"flashcards": [{"front": "What is X?", "back": "X is Y."}]}"#;
        let cards = parse_flashcards(raw).unwrap();
        assert_eq!(
            cards,
            vec![Flashcard {
                front: "What is X?".to_string(),
                back: "X is Y.".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_flashcards_code_fence() {
        let raw = "```json\n{\"flashcards\": [{\"front\": \"Q\", \"back\": \"A\"}]}\n```";
        assert_eq!(parse_flashcards(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_flashcards_invalid() {
        assert!(matches!(parse_flashcards("not json"), Err(FlashcardError::InvalidData(_))));
        assert!(matches!(
            parse_flashcards(r#"{"flashcards": []}"#),
            Err(FlashcardError::InvalidData(_))
        ));
    }

    /// Only answers with JSON when asked for JSON mode
    struct JsonOnly;

    #[async_trait]
    impl Generator for JsonOnly {
        async fn generate(&self, _system: &str, _user: &str, _cancel: &CancellationToken) -> Result<String, GenerateError> {
            Ok("Sure! Here are your flashcards.".to_string())
        }

        async fn generate_json(
            &self,
            _system: &str,
            _user: &str,
            _cancel: &CancellationToken,
        ) -> Result<String, GenerateError> {
            Ok(r#"{"flashcards": [{"front": "Q", "back": "A"}]}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_flashcards_request_json_mode() {
        let cards = generate_flashcards(&JsonOnly, "transcript", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            cards,
            vec![Flashcard {
                front: "Q".to_string(),
                back: "A".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_summary_without_transcript_is_disclaimed() {
        let video_id = crate::resolve_video_id("https://youtu.be/abc123").unwrap();
        let summary = summarize_without_transcript(&Echo, &video_id, "Crabs Explained", &CancellationToken::new())
            .await
            .unwrap();
        assert!(summary.starts_with(NO_TRANSCRIPT_DISCLAIMER));
        assert!(summary.contains("abc123"));
        assert!(summary.contains("\"Crabs Explained\""));
        assert!(summary.ends_with("title."));
    }
}
