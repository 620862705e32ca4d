use serde::Serialize;
use uuid::Uuid;

use crate::models::candidate::CandidateProfile;
use crate::models::transcript::{Message, Role};

/// Number of model-generated questions per interview.
pub const MAX_QUESTIONS: u32 = 5;

/// Phase of the interview, derived from `SessionState`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    AwaitingFirstQuestion,
    AwaitingAnswer,
    Complete,
}

/// Mutable state of one interview: the transcript, the number of questions
/// asked so far and the started/ended lifecycle flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub transcript: Vec<Message>,
    pub question_count: u32,
    pub started: bool,
    pub ended: bool,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        if self.ended {
            Phase::Complete
        } else if !self.started {
            Phase::NotStarted
        } else if self.question_count == 0 {
            Phase::AwaitingFirstQuestion
        } else {
            Phase::AwaitingAnswer
        }
    }

    /// Restores the initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Transcript without the system prompt, i.e. what the candidate sees.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.transcript.iter().filter(|m| m.role != Role::System)
    }
}

/// Outcome of the transcript export, kept on the session for status reads.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
    Stored { locator: String },
    Failed { error: String },
}

/// Session context object handed to the driver on every invocation.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: Uuid,
    pub state: SessionState,
    pub profile: Option<CandidateProfile>,
    pub export: Option<ExportStatus>,
}

impl InterviewSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: SessionState::default(),
            profile: None,
            export: None,
        }
    }

    /// Explicit reset: drops the profile, transcript and export outcome.
    pub fn reset(&mut self) {
        self.state.reset();
        self.profile = None;
        self.export = None;
    }
}
