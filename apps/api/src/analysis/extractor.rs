//! AI Extractor — turns résumé text into a `ResumeAnalysis` via one model call.
//!
//! The model is untrusted: its reply may wrap the JSON in prose, omit fields,
//! or use the wrong types. The outermost `{ … }` span of the reply is parsed
//! and then read field by field; anything unusable degrades to the fixed
//! fallback object instead of failing the upload.
//!
//! What gets stored is the typed reading, not the raw model JSON: unknown
//! keys are dropped, blank strings become `null` (nested items included),
//! list elements of the wrong type are skipped, and non-object entries in
//! object lists are discarded.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::analysis::prompts::build_analysis_prompt;
use crate::llm_client::{GenerativeModel, LlmError};
use crate::models::analysis::{
    Certification, Education, Experience, Feedback, PersonalDetails, Project, ResumeAnalysis,
    ResumeContent, Skills,
};

/// Outcome of one extraction. Both variants carry a well-formed analysis;
/// `Fallback` always holds `ResumeAnalysis::fallback()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(ResumeAnalysis),
    Fallback(ResumeAnalysis),
}

impl Extraction {
    fn fallback() -> Self {
        Extraction::Fallback(ResumeAnalysis::fallback())
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }

    pub fn into_analysis(self) -> ResumeAnalysis {
        match self {
            Extraction::Parsed(a) | Extraction::Fallback(a) => a,
        }
    }
}

/// Runs the model over `resume_text` and interprets its reply.
///
/// The only error returned is `LlmError::MissingApiKey`; transport and
/// provider failures fall back like an unparsable reply.
pub async fn extract_analysis(
    model: &dyn GenerativeModel,
    resume_text: &str,
) -> Result<Extraction, LlmError> {
    let prompt = build_analysis_prompt(resume_text);

    let reply = match model.generate(&prompt).await {
        Ok(reply) => reply,
        Err(LlmError::MissingApiKey) => return Err(LlmError::MissingApiKey),
        Err(e) => {
            warn!("Model call failed, using fallback analysis: {e}");
            return Ok(Extraction::fallback());
        }
    };

    Ok(interpret_reply(&reply))
}

/// Parses a free-form model reply into an `Extraction`.
pub fn interpret_reply(reply: &str) -> Extraction {
    let Some(candidate) = json_object_span(reply) else {
        warn!("Model reply contains no JSON object, using fallback analysis");
        return Extraction::fallback();
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => {
            debug!("Model reply parsed ({} bytes of JSON)", candidate.len());
            Extraction::Parsed(read_analysis(&value))
        }
        Err(e) => {
            warn!("Model reply is not valid JSON, using fallback analysis: {e}");
            Extraction::fallback()
        }
    }
}

/// The span from the first `{` to the last `}` inclusive, if the first
/// precedes the last.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient readers
// ────────────────────────────────────────────────────────────────────────────

fn read_analysis(value: &Value) -> ResumeAnalysis {
    let personal = value.get("personalDetails");
    let content = value.get("resumeContent");
    let skills = value.get("skills");
    let feedback = value.get("feedback");

    ResumeAnalysis {
        personal_details: PersonalDetails {
            name: text(field(personal, "name")),
            email: text(field(personal, "email")),
            phone: text(field(personal, "phone")),
            links: text_list(field(personal, "links")),
        },
        resume_content: ResumeContent {
            summary: text(field(content, "summary")),
            experience: object_list(field(content, "experience"), |o| Experience {
                company: text(o.get("company")),
                title: text(o.get("title")),
                start_date: text(o.get("startDate")),
                end_date: text(o.get("endDate")),
                description: text(o.get("description")),
            }),
            education: object_list(field(content, "education"), |o| Education {
                institution: text(o.get("institution")),
                degree: text(o.get("degree")),
                start_date: text(o.get("startDate")),
                end_date: text(o.get("endDate")),
            }),
            projects: object_list(field(content, "projects"), |o| Project {
                name: text(o.get("name")),
                description: text(o.get("description")),
                tech: text_list(o.get("tech")),
            }),
            certifications: object_list(field(content, "certifications"), |o| Certification {
                name: text(o.get("name")),
                issuer: text(o.get("issuer")),
                date: text(o.get("date")),
            }),
        },
        skills: Skills {
            technical: text_list(field(skills, "technical")),
            soft: text_list(field(skills, "soft")),
        },
        feedback: Feedback {
            rating: field(feedback, "rating").and_then(Value::as_f64),
            improvement_areas: improvement_areas(field(feedback, "improvementAreas")),
            suggested_skills: text_list(field(feedback, "suggestedSkills")),
        },
    }
}

fn field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|p| p.get(key))
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn object_list<T>(value: Option<&Value>, read: impl Fn(&Map<String, Value>) -> T) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_object).map(&read).collect())
        .unwrap_or_default()
}

/// Some models answer with a bullet list instead of a paragraph.
fn improvement_areas(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}
