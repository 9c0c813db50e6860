pub mod email;
pub mod moderation;
pub mod notification;
pub mod slack;

pub use email::EmailService;
pub use moderation::{ModerationOutcome, ModerationService, Submission, SubmittedContent};
pub use notification::{ModerationAlert, NotificationService};
pub use slack::SlackNotifier;
