pub use super::accounts::Entity as Accounts;
pub use super::hierarchy_edges::Entity as HierarchyEdges;
pub use super::otp_verifications::Entity as OtpVerifications;
pub use super::pending_registrations::Entity as PendingRegistrations;
