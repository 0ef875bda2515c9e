use serde_json::{json, Value};

pub const EXTRACTION_INSTRUCTIONS: &str = "\
You are a resume parser. Extract the candidate's details from the attached resume.
Rules:
- mobile: digits only, no spaces, dashes, brackets or plus signs.
- skills: one flat list containing both technical and soft skills.
- totalExperience and relevantExperience: copy the wording used in the resume \
(for example \"5 years 6 months\"); do not convert to a number.
- dob, currentCTC, expectedCTC and noticePeriod: copy as written.
- If a field is not present in the resume, return an empty string (or an empty \
list for skills). Never guess or invent values.";

pub const MATCH_INSTRUCTIONS: &str = "\
You are a technical recruiter. Compare the candidate summary with the job \
description and rate how well the candidate fits the role.
Return matchScore as an integer from 0 to 100 and matchReason as one or two \
sentences naming the strongest alignment and the biggest gap.";

const EXTRACTION_FIELDS: [&str; 15] = [
    "fullName",
    "email",
    "mobile",
    "dob",
    "currentCompany",
    "designation",
    "totalExperience",
    "relevantExperience",
    "skills",
    "currentCTC",
    "expectedCTC",
    "noticePeriod",
    "highestQualification",
    "educationField",
    "currentLocation",
];

const EXTRACTION_REQUIRED: [&str; 7] = [
    "fullName",
    "email",
    "mobile",
    "totalExperience",
    "highestQualification",
    "currentLocation",
    "skills",
];

pub fn extraction_schema() -> Value {
    let properties: serde_json::Map<String, Value> = EXTRACTION_FIELDS
        .iter()
        .map(|field| {
            let schema = if *field == "skills" {
                json!({ "type": "ARRAY", "items": { "type": "STRING" } })
            } else {
                json!({ "type": "STRING" })
            };
            (field.to_string(), schema)
        })
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": EXTRACTION_REQUIRED,
    })
}

pub fn match_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "matchScore": { "type": "INTEGER" },
            "matchReason": { "type": "STRING" },
        },
        "required": ["matchScore", "matchReason"],
    })
}

pub fn match_prompt(candidate_summary: &Value, job_description: &str) -> String {
    format!(
        "{MATCH_INSTRUCTIONS}\n\nJob description:\n{}\n\nCandidate summary (JSON):\n{}",
        job_description.trim(),
        candidate_summary
    )
}
