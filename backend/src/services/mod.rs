// Concrete collaborators for the automation engine

pub mod email;
pub mod enrichment;
pub mod integrations;

pub use email::{EmailNotificationSender, LogNotificationSender};
pub use enrichment::ChannelEnrichmentQueue;
pub use integrations::HttpIntegrationInvoker;
