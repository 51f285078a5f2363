// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini API client and content-calendar parsing.
//!
//! The model is asked for exactly 7 structured entries. Its raw text reply
//! is stripped of markdown code fences and parsed as JSON; any parse or
//! shape failure aborts the request before a single post is written.

use crate::error::AppError;
use crate::models::{Post, PostStatus};
use anyhow::anyhow;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    /// Override the API base URL (tests point this at a stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send one prompt and return the first candidate's text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow!(
                "Gemini API returned HTTP {}: {}",
                status,
                body
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow!("Gemini response parse error: {}", e)))?;

        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| AppError::Internal(anyhow!("Gemini returned no candidate text")))?;

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// ─── Calendar Prompt & Parsing ───────────────────────────────────

/// One generated calendar entry, as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPost {
    pub day: u32,
    pub idea: String,
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Build the fixed calendar prompt for a business idea.
pub fn build_calendar_prompt(business_idea: &str) -> String {
    format!(
        r##"You are a social media marketing expert. Create a 7-day content calendar for the following business idea: "{business_idea}"

Generate EXACTLY 7 social media posts (one for each day). For each post, provide:
- day: Day number (1-7)
- idea: A brief one-line content idea
- caption: An engaging caption (2-3 sentences, conversational tone)
- hashtags: Array of 5-8 relevant hashtags (including the #)

Return ONLY valid JSON in this exact format, no additional text:
{{
  "posts": [
    {{
      "day": 1,
      "idea": "content idea here",
      "caption": "engaging caption here",
      "hashtags": ["#hashtag1", "#hashtag2", "#hashtag3"]
    }}
  ]
}}"##
    )
}

/// Remove markdown code-fence wrapping that models often add around JSON.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the model's reply into calendar entries.
///
/// The top-level shape is validated first (`posts` must be a list); only
/// then are the entries deserialized. Any failure is an upstream parse
/// error and nothing gets persisted.
pub fn parse_calendar(raw_text: &str) -> Result<Vec<GeneratedPost>, AppError> {
    let cleaned = strip_code_fences(raw_text);

    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| AppError::UpstreamParse(format!("invalid JSON: {}", e)))?;

    let posts = value
        .get("posts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            AppError::UpstreamParse("expected a 'posts' array in response".to_string())
        })?;

    posts
        .iter()
        .map(|entry| {
            serde_json::from_value(entry.clone())
                .map_err(|e| AppError::UpstreamParse(format!("malformed post entry: {}", e)))
        })
        .collect()
}

/// Turn generated entries into storable draft posts for a user.
pub fn to_draft_posts(uid: &str, entries: Vec<GeneratedPost>, now: &str) -> Vec<Post> {
    entries
        .into_iter()
        .map(|entry| Post {
            id: String::new(),
            user_id: uid.to_string(),
            day: entry.day,
            idea: entry.idea,
            caption: entry.caption,
            hashtags: entry.hashtags,
            status: PostStatus::Draft,
            image_url: None,
            post_date: None,
            posted_at: None,
            post_results: None,
            created_at: now.to_string(),
            updated_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r##"{
        "posts": [
            {"day": 1, "idea": "a", "caption": "c1", "hashtags": ["#x"]},
            {"day": 2, "idea": "b", "caption": "c2", "hashtags": ["#y", "#z"]}
        ]
    }"##;

    #[test]
    fn test_strip_code_fences() {
        let fenced = "```json\n{\"posts\": []}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"posts\": []}");

        let plain = "{\"posts\": []}";
        assert_eq!(strip_code_fences(plain), "{\"posts\": []}");
    }

    #[test]
    fn test_parse_calendar_well_formed() {
        let entries = parse_calendar(WELL_FORMED).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].day, 1);
        assert_eq!(entries[1].hashtags, vec!["#y", "#z"]);
    }

    #[test]
    fn test_parse_calendar_fenced() {
        let fenced = format!("```json\n{}\n```", WELL_FORMED);
        let entries = parse_calendar(&fenced).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_parse_calendar_invalid_json() {
        assert!(matches!(
            parse_calendar("I'm sorry, I can't do that"),
            Err(AppError::UpstreamParse(_))
        ));
    }

    #[test]
    fn test_parse_calendar_wrong_shape() {
        assert!(matches!(
            parse_calendar(r#"{"posts": "not a list"}"#),
            Err(AppError::UpstreamParse(_))
        ));
        assert!(matches!(
            parse_calendar(r#"{"days": []}"#),
            Err(AppError::UpstreamParse(_))
        ));
    }

    #[test]
    fn test_to_draft_posts() {
        let entries = parse_calendar(WELL_FORMED).unwrap();
        let posts = to_draft_posts("uid_1", entries, "2026-01-01T00:00:00Z");

        assert_eq!(posts.len(), 2);
        for post in &posts {
            assert_eq!(post.user_id, "uid_1");
            assert_eq!(post.status, PostStatus::Draft);
            assert!(post.image_url.is_none());
        }
        assert_eq!(posts[0].day, 1);
        assert_eq!(posts[1].day, 2);
    }

    #[test]
    fn test_prompt_contains_business_idea() {
        let prompt = build_calendar_prompt("artisanal candles");
        assert!(prompt.contains("artisanal candles"));
        assert!(prompt.contains("EXACTLY 7"));
    }
}
