use serde::{Deserialize, Serialize};

use crate::models::transcript::Message;

/// A validated candidate profile. Only produced by `interview::profile::submit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateProfile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience: u32,
    pub desired_positions: String,
    pub location: String,
    pub tech_stack: Vec<String>,
}

impl CandidateProfile {
    /// True when the candidate picked no technologies (or only the "None" option),
    /// in which case questions are drawn from the desired positions instead.
    pub fn has_no_tech_stack(&self) -> bool {
        self.tech_stack
            .iter()
            .all(|t| t.trim().is_empty() || t.trim().eq_ignore_ascii_case("none"))
    }
}

/// The JSON object persisted once per completed interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub experience: u32,
    pub desired_positions: String,
    pub location: String,
    pub tech_stack: Vec<String>,
    pub interview_log: Vec<Message>,
}

impl InterviewRecord {
    pub fn new(profile: &CandidateProfile, transcript: &[Message]) -> Self {
        Self {
            name: profile.full_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            experience: profile.experience,
            desired_positions: profile.desired_positions.clone(),
            location: profile.location.clone(),
            tech_stack: profile.tech_stack.clone(),
            interview_log: transcript.to_vec(),
        }
    }
}
