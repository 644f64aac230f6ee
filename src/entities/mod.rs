pub mod prelude;

pub mod accounts;
pub mod hierarchy_edges;
pub mod otp_verifications;
pub mod pending_registrations;
