pub mod account_store;
pub mod account_store_impl;
pub use account_store::{AccountError, AccountStore};
pub use account_store_impl::SeaOrmAccountStore;

pub mod otp_channel;
pub mod otp_channel_impl;
pub use otp_channel::{IssuedOtp, OtpChannel, OtpDelivery, OtpError};
pub use otp_channel_impl::{SeaOrmOtpChannel, TracingDelivery};

pub mod token_issuer;
pub mod token_issuer_impl;
pub use token_issuer::{Claims, TokenError, TokenIssuer, TokenPair, TokenType};
pub use token_issuer_impl::JwtTokenIssuer;

pub mod registration_service;
pub mod registration_service_impl;
pub use registration_service::{
    AccountView, AuthSession, PendingTicket, RegistrationError, RegistrationRequest,
    RegistrationService, VerifyRequest,
};
pub use registration_service_impl::SeaOrmRegistrationService;

pub mod sweeper;
pub use sweeper::{SweepReport, Sweeper};
