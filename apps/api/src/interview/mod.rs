// Candidate screening interview.
// Intake → system prompt → five model-generated questions → JSON export.
// All model calls go through llm_client::ChatModel; all uploads through storage::BlobStore.

pub mod driver;
pub mod export;
pub mod handlers;
pub mod machine;
pub mod profile;
pub mod prompts;
pub mod session;
pub mod store;
