// Drop Warden Library - Moderated drop-submission tracking
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod export;
pub mod notify;
pub mod store;
pub mod submission;
pub mod teams;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, DropWardenConfig};
pub use notify::{deliver_plan, DeliveryReport, NotificationPlan, Notifier};
pub use store::{InMemoryStore, JsonFileStore, StoreError, SubmissionFilter, SubmissionStore};
pub use submission::{
    Category, Decision, DropId, MessageRef, NewSubmission, Submission, SubmissionStatus, TeamId,
    UserId,
};
pub use teams::{Team, TeamRegistry};
pub use telemetry::init_telemetry;
pub use workflow::{
    Attachment, DecideRequest, ProgressSummary, ResetOutcome, SubmissionWorkflow, SubmitRequest,
    ValidationError, WorkflowError, WorkflowOutcome,
};
