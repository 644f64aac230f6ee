pub mod account;
pub mod hierarchy;
pub mod otp;
pub mod pending;
