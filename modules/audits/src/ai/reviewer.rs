//! Criterion reviewer backed by a language model.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::ollama::OllamaClient;
use super::AiError;
use crate::contract::Verdict;
use crate::engine::wcag;

const SYSTEM_PROMPT: &str = "You are a WCAG 2.1 accessibility auditor. You review the findings of \
an automated checker for one success criterion and answer with a short JSON verdict.";

/// What the reviewer is shown for one criterion
#[derive(Debug, Clone)]
pub struct ReviewRequest<'a> {
    pub code: &'a str,
    pub verdict: Verdict,
    pub details: &'a Map<String, Value>,
    pub html_snippet: &'a str,
}

/// Normalized reviewer answer
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub verdict: Verdict,
    pub score_0_2: Option<i64>,
    pub explanation: String,
    /// Full model answer, kept for the audit trail
    pub raw: Map<String, Value>,
}

impl Review {
    /// Lenient reading of a model answer: unknown verdicts count as partial
    pub fn from_answer(answer: Map<String, Value>) -> Self {
        let verdict = answer
            .get("verdict")
            .and_then(Value::as_str)
            .and_then(Verdict::parse)
            .unwrap_or(Verdict::Partial);
        let score_0_2 = answer.get("score_0_2").and_then(|v| match v {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let explanation = answer
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            verdict,
            score_0_2,
            explanation,
            raw: answer,
        }
    }

    /// `ai_info` entry stored in the criterion details
    pub fn to_info(&self) -> Value {
        json!({
            "ai_used": true,
            "ai_review": Value::Object(self.raw.clone()),
            "suggested_verdict": self.verdict.as_str(),
            "score_0_2": self.score_0_2,
            "explanation": self.explanation,
            "manual_required": self.raw.get("manual_review").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// Second opinion on a heuristic outcome
#[async_trait]
pub trait AiReviewer: Send + Sync {
    async fn review(&self, request: ReviewRequest<'_>) -> Result<Review, AiError>;
}

/// [`AiReviewer`] that asks an Ollama model
pub struct OllamaReviewer {
    client: OllamaClient,
}

impl OllamaReviewer {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    fn prompt(code: &str) -> String {
        let title = wcag::meta(code).map_or("", |m| m.title);
        format!(
            "Evaluate WCAG 2.1 success criterion {code} ({title}). The automated findings and an \
             HTML sample are in the context. Say whether the offenders are real failures, suggest \
             concrete fixes, and return JSON with: {{ verdict: \"pass\"|\"partial\"|\"fail\"|\"na\", \
             score_0_2: 0|1|2, explanation: string, suggestions?: [string], manual_review?: bool }}"
        )
    }
}

fn review_context(request: &ReviewRequest<'_>) -> Value {
    let mut findings = request.details.clone();
    if let Some(Value::Array(offenders)) = findings.get_mut("offenders") {
        offenders.truncate(5);
    }
    json!({
        "code": request.code,
        "heuristic_verdict": request.verdict.as_str(),
        "findings": Value::Object(findings),
        "html_snippet": request.html_snippet,
    })
}

#[async_trait]
impl AiReviewer for OllamaReviewer {
    async fn review(&self, request: ReviewRequest<'_>) -> Result<Review, AiError> {
        let context = review_context(&request).to_string();
        tracing::debug!(code = request.code, model = self.client.model(), "asking model for review");
        let answer = self
            .client
            .ask_json(&Self::prompt(request.code), &context, Some(SYSTEM_PROMPT))
            .await;
        if answer.get("parse_error").and_then(Value::as_bool) == Some(true) {
            let text = answer
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(AiError::Unparseable(text));
        }
        Ok(Review::from_answer(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn unknown_verdict_becomes_partial() {
        let review = Review::from_answer(map(json!({"verdict": "maybe", "score_0_2": "1"})));
        assert_eq!(review.verdict, Verdict::Partial);
        assert_eq!(review.score_0_2, Some(1));
        assert_eq!(review.explanation, "");
    }

    #[test]
    fn reads_well_formed_answer() {
        let review = Review::from_answer(map(json!({
            "verdict": "FAIL",
            "score_0_2": 0,
            "explanation": "Two images lack alt text.",
            "manual_review": true
        })));
        assert_eq!(review.verdict, Verdict::Fail);
        assert_eq!(review.score_0_2, Some(0));
        assert_eq!(review.to_info()["manual_required"], json!(true));
        assert_eq!(review.to_info()["ai_used"], json!(true));
    }

    #[test]
    fn context_keeps_a_few_offenders() {
        let details = map(json!({"offenders": [1, 2, 3, 4, 5, 6, 7], "missing_alt": 7}));
        let ctx = review_context(&ReviewRequest {
            code: "1.1.1",
            verdict: Verdict::Fail,
            details: &details,
            html_snippet: "<img src=a.png>",
        });
        assert_eq!(ctx["findings"]["offenders"].as_array().map(Vec::len), Some(5));
        assert_eq!(ctx["heuristic_verdict"], json!("fail"));
    }
}
