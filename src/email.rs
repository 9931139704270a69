//! Email address checks shared by registration and verification.

use lazy_static::lazy_static;
use regex::Regex;

const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "tempmail.com",
    "temp-mail.org",
    "guerrillamail.com",
    "yopmail.com",
    "sharklasers.com",
    "throwawaymail.com",
    "10minutemail.com",
    "mailnesia.com",
    "trashmail.com",
    "dispostable.com",
];

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailRejection {
    Required,
    InvalidFormat,
    Disposable,
}

impl EmailRejection {
    pub fn reason(self) -> &'static str {
        match self {
            EmailRejection::Required => "required",
            EmailRejection::InvalidFormat => "invalid format",
            EmailRejection::Disposable => "disposable not allowed",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            EmailRejection::Required => "Email is required",
            EmailRejection::InvalidFormat => "Invalid email format",
            EmailRejection::Disposable => "Disposable email addresses are not allowed",
        }
    }
}

pub(crate) fn is_valid_format(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_disposable(email: &str) -> bool {
    email
        .split_once('@')
        .map(|(_, domain)| {
            let domain = domain.to_ascii_lowercase();
            DISPOSABLE_DOMAINS.contains(&domain.as_str())
        })
        .unwrap_or(false)
}

/// Checks run in order, the first failure wins.
pub fn validate(email: &str) -> Result<(), EmailRejection> {
    if email.trim().is_empty() {
        return Err(EmailRejection::Required);
    }
    if !is_valid_format(email) {
        return Err(EmailRejection::InvalidFormat);
    }
    if is_disposable(email) {
        return Err(EmailRejection::Disposable);
    }
    Ok(())
}
