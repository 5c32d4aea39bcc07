//! Wire types for the salary analysis response.
//!
//! Field names are camelCase on the wire — the shapes the model is asked to
//! produce and the shapes the API returns are identical.

use serde::{Deserialize, Serialize};

/// Experience tier assigned by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[default]
    Junior,
    #[serde(rename = "Mid-level")]
    MidLevel,
    Senior,
}

/// Market demand tier assigned by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub level: ExperienceLevel,
    pub years: f64,
    pub key_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDemand {
    pub level: DemandLevel,
    pub reasons: Vec<String>,
}

/// The structured outcome of one analysis. A populated `error` marker and a
/// fully-populated result are mutually exclusive: fallback results carry
/// zeroed numerics, empty sequences, and the default tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryAnalysis {
    /// Estimated monthly salary in SEK.
    pub estimated_salary: f64,
    pub experience: Experience,
    pub market_demand: MarketDemand,
    pub location: String,
    pub industry: String,
    pub salary_factors: Vec<String>,
    pub considerations: Vec<String>,
    /// Model self-reported confidence, 0.0–1.0.
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SalaryAnalysis {
    /// The terminal fallback result: everything defaulted, error populated.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            estimated_salary: 0.0,
            experience: Experience {
                level: ExperienceLevel::Junior,
                years: 0.0,
                key_skills: Vec::new(),
            },
            market_demand: MarketDemand {
                level: DemandLevel::Medium,
                reasons: Vec::new(),
            },
            location: String::new(),
            industry: String::new(),
            salary_factors: Vec::new(),
            considerations: Vec::new(),
            confidence_score: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}
