use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_FEEDBACK_PARSED: &str = "No feedback parsed";

// ────────────────────────────────────────────────────────────────────────────
// Structured analysis object (the shape the model is asked to return)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeAnalysis {
    pub personal_details: PersonalDetails,
    pub resume_content: ResumeContent,
    pub skills: Skills,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeContent {
    pub summary: Option<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub company: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Certification {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skills {
    pub technical: Vec<String>,
    pub soft: Vec<String>,
}

/// Model feedback. `rating` is kept exactly as the model sent it: no range
/// is enforced and a missing or non-numeric rating stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feedback {
    pub rating: Option<f64>,
    pub improvement_areas: Option<String>,
    pub suggested_skills: Vec<String>,
}

impl ResumeAnalysis {
    /// The fixed object substituted when the model reply is unusable.
    pub fn fallback() -> Self {
        ResumeAnalysis {
            feedback: Feedback {
                rating: Some(0.0),
                improvement_areas: Some(NO_FEEDBACK_PARSED.to_string()),
                suggested_skills: Vec::new(),
            },
            ..Default::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Persisted record
// ────────────────────────────────────────────────────────────────────────────

/// Fields written by one upload, already flattened into the record layout.
/// `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAnalysis {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Vec<String>,
    pub summary: Option<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub rating: Option<f64>,
    pub improvement_areas: Option<String>,
    pub suggested_skills: Vec<String>,
    pub original_filename: String,
    pub raw_text: String,
}

impl NewAnalysis {
    pub fn flatten(analysis: ResumeAnalysis, original_filename: &str, raw_text: String) -> Self {
        let ResumeAnalysis {
            personal_details,
            resume_content,
            skills,
            feedback,
        } = analysis;

        NewAnalysis {
            name: personal_details.name,
            email: personal_details.email,
            phone: personal_details.phone,
            links: personal_details.links,
            summary: resume_content.summary,
            experience: resume_content.experience,
            education: resume_content.education,
            projects: resume_content.projects,
            certifications: resume_content.certifications,
            technical_skills: skills.technical,
            soft_skills: skills.soft,
            rating: feedback.rating,
            improvement_areas: feedback.improvement_areas,
            suggested_skills: feedback.suggested_skills,
            original_filename: original_filename.to_string(),
            raw_text,
        }
    }
}

/// One persisted analysis with every sequence field materialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Vec<String>,
    pub summary: Option<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub rating: Option<f64>,
    pub improvement_areas: Option<String>,
    pub suggested_skills: Vec<String>,
    pub original_filename: String,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

/// History listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisSummary {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
}
