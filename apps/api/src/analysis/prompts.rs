//! The fixed analysis instruction and the response schema handed to the model.

use serde_json::{json, Value};

/// Instruction sent with every analysis request. The embedded example mirrors
/// the wire shape of `SalaryAnalysis` exactly.
pub const ANALYSIS_PROMPT: &str = r#"Analyze this resume for the Swedish job market and provide monthly salary insights. Return ONLY a JSON object without any markdown formatting or additional text. The response must match this exact format:

{
  "estimatedSalary": 45000,
  "experience": {
    "level": "Mid-level",
    "years": 5,
    "keySkills": ["JavaScript", "React", "Node.js"]
  },
  "marketDemand": {
    "level": "High",
    "reasons": ["Growing tech sector", "High demand for web developers"]
  },
  "location": "Stockholm",
  "industry": "Technology",
  "salaryFactors": ["Strong technical skills", "Relevant experience"],
  "considerations": ["Market competition", "Company size"],
  "confidenceScore": 0.85
}

Important rules:
1. Return ONLY the JSON object, no other text
2. estimatedSalary must be a number in SEK
3. experience.level must be exactly "Junior", "Mid-level", or "Senior"
4. experience.years must be a number
5. marketDemand.level must be exactly "Low", "Medium", or "High"
6. confidenceScore must be a number between 0 and 1

Base your analysis on:
1. Technical skills and expertise
2. Years of experience
3. Current Swedish market conditions
4. Industry standards
5. Location within Sweden"#;

/// OpenAPI-style response schema for Gemini's schema-constrained decoding.
/// Kept in lockstep with `SalaryAnalysis` and the prompt example above.
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "estimatedSalary": { "type": "NUMBER" },
            "experience": {
                "type": "OBJECT",
                "properties": {
                    "level": {
                        "type": "STRING",
                        "enum": ["Junior", "Mid-level", "Senior"]
                    },
                    "years": { "type": "NUMBER" },
                    "keySkills": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["level", "years", "keySkills"]
            },
            "marketDemand": {
                "type": "OBJECT",
                "properties": {
                    "level": {
                        "type": "STRING",
                        "enum": ["Low", "Medium", "High"]
                    },
                    "reasons": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["level", "reasons"]
            },
            "location": { "type": "STRING" },
            "industry": { "type": "STRING" },
            "salaryFactors": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "considerations": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "confidenceScore": { "type": "NUMBER" }
        },
        "required": [
            "estimatedSalary",
            "experience",
            "marketDemand",
            "location",
            "industry",
            "salaryFactors",
            "considerations",
            "confidenceScore"
        ]
    })
}
