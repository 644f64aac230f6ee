pub mod accounts {

    pub const USERNAME_PREFIX: &str = "M";

    pub const USERNAME_DIGITS: usize = 6;

    pub const MAX_PHONE_LENGTH: usize = 15;

    pub const MAX_REFERRAL_CODE_LENGTH: usize = 10;

    pub const MAX_NAME_LENGTH: usize = 150;
}

pub mod otp {

    pub const CODE_LENGTH: usize = 6;
}

pub mod expiry {

    /// Upper bound for OTP and pending registration lifetimes.
    pub const MAX_SECONDS: u64 = 7 * 24 * 60 * 60;

    #[must_use]
    pub fn clamped(seconds: u64) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(seconds.min(MAX_SECONDS)).unwrap_or_default())
    }
}

pub mod limits {

    /// Upper bound accepted for `max_depth` on downline queries.
    pub const MAX_QUERY_DEPTH: u32 = 1000;
}
