// Analysis LLM prompt template.

pub const ANALYSIS_PROMPT: &str = r#"You are an expert resume analyst. Extract structured data from the provided resume text.
Return strictly valid JSON with the following shape:
{
  "personalDetails": { "name": string|null, "email": string|null, "phone": string|null, "links": string[] },
  "resumeContent": {
    "summary": string|null,
    "experience": [{ "company": string|null, "title": string|null, "startDate": string|null, "endDate": string|null, "description": string|null }],
    "education": [{ "institution": string|null, "degree": string|null, "startDate": string|null, "endDate": string|null }],
    "projects": [{ "name": string|null, "description": string|null, "tech": string[] }],
    "certifications": [{ "name": string|null, "issuer": string|null, "date": string|null }]
  },
  "skills": { "technical": string[], "soft": string[] },
  "feedback": {
    "rating": number,
    "improvementAreas": string,
    "suggestedSkills": string[]
  }
}"#;

/// Builds the single prompt sent to the model for one résumé.
pub fn build_analysis_prompt(resume_text: &str) -> String {
    format!("{ANALYSIS_PROMPT}\n\nResume Text:\n\n{resume_text}")
}
