use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::candidate::CandidateProfile;

/// Options offered by the tech stack multi-select.
pub const TECH_STACK_OPTIONS: &[&str] = &[
    "Python",
    "JavaScript",
    "Java",
    "C++",
    "Go",
    "Ruby",
    "C#",
    "None",
    "Django",
    "Flask",
    "React",
    "Angular",
    "Vue.js",
    "Streamlit",
    "TensorFlow",
    "PyTorch",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Docker",
    "Kubernetes",
];

pub const DEFAULT_TECH_STACK: &[&str] = &["Python"];

/// Bounds of the experience input. Widget hints only; intake does not enforce them.
pub const EXPERIENCE_RANGE_YEARS: (u32, u32) = (0, 50);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields before continuing (missing: {0})")]
    MissingField(&'static str),
}

/// Raw form submission. Every field is optional on the wire so that a missing
/// field surfaces as a `ValidationError` instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience: Option<u32>,
    pub desired_positions: Option<String>,
    pub location: Option<String>,
    pub tech_stack: Option<Vec<String>>,
}

/// Presence-only validation of the intake form.
///
/// Every text field and the tech stack must be non-empty; `experience` is exempt
/// and defaults to zero.
pub fn submit(form: ProfileForm) -> Result<CandidateProfile, ValidationError> {
    let full_name = required(form.full_name, "full_name")?;
    let email = required(form.email, "email")?;
    let phone = required(form.phone, "phone")?;
    let desired_positions = required(form.desired_positions, "desired_positions")?;
    let location = required(form.location, "location")?;

    let tech_stack: Vec<String> = form
        .tech_stack
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tech_stack.is_empty() {
        return Err(ValidationError::MissingField("tech_stack"));
    }

    Ok(CandidateProfile {
        full_name,
        email,
        phone,
        experience: form.experience.unwrap_or(0),
        desired_positions,
        location,
        tech_stack,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}
