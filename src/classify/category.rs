//! Failure taxonomy and the static target/excluded disposition.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::error_handling::UnknownCategoryError;

/// Probable cause of a permanent delivery failure.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Sending IP or host is on a blocklist
    IpBlock,
    /// Sending domain rejected by recipient policy
    DomainBlock,
    /// Sending rate or volume limits exceeded
    #[serde(alias = "sender_throttle")]
    SendThrottle,
    /// Problem on the sending server itself
    ServerError,
    /// DNS authentication, relay or routing misconfiguration
    ConfigError,
    /// Recipient address does not exist
    #[serde(alias = "user_unknown")]
    UnknownRecipient,
    /// Recipient mailbox over quota
    #[serde(alias = "user_mailbox_full")]
    MailboxFull,
    /// Recipient side rate limit
    #[serde(alias = "user_rate_limit")]
    RecipientRateLimit,
}

/// Whether a failure needs action by the sending side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    /// Actionable by the sender's administrators
    Target,
    /// Caused by the recipient; reported but not actionable
    Excluded,
}

impl Category {
    /// Category used when classification is unavailable
    pub const DEFAULT: Category = Category::ServerError;

    /// Canonical snake_case token.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Description given to the model for this category.
    pub fn prompt_description(&self) -> &'static str {
        match self {
            Category::IpBlock => {
                "Sending server IP/host blocked on blocklist (Spamhaus, RBL, DNSBL, blacklist)"
            }
            Category::DomainBlock => "Sending domain blocked or rejected by recipient policy",
            Category::SendThrottle => {
                "Sending rate/volume limits exceeded, spam throttling, too many connections"
            }
            Category::ServerError => {
                "Sending server down, disk full, TLS/certificate issues, internal server error"
            }
            Category::ConfigError => {
                "DNS misconfiguration (SPF/DKIM/DMARC), relay denied (sending server not authorized to relay), network/routing problems"
            }
            Category::UnknownRecipient => {
                "Wrong/nonexistent recipient address, recipient domain typo or not found"
            }
            Category::MailboxFull => "Recipient mailbox over quota / storage full",
            Category::RecipientRateLimit => {
                "Recipient is receiving mail at a rate that prevents delivery (recipient-side rate limit)"
            }
        }
    }

    /// Short human readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Category::IpBlock => "IP blocklisted",
            Category::DomainBlock => "Domain blocked",
            Category::SendThrottle => "Sending throttled",
            Category::ServerError => "Sending server error",
            Category::ConfigError => "Configuration error",
            Category::UnknownRecipient => "Unknown recipient",
            Category::MailboxFull => "Mailbox full",
            Category::RecipientRateLimit => "Recipient rate limit",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Category::IpBlock
            | Category::DomainBlock
            | Category::SendThrottle
            | Category::ServerError
            | Category::ConfigError => Disposition::Target,
            Category::UnknownRecipient | Category::MailboxFull | Category::RecipientRateLimit => {
                Disposition::Excluded
            }
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategoryError;

    /// Accepts canonical tokens, legacy labels, any case, and `-`/space
    /// separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .trim()
            .trim_matches(['"', '\'', '`', '.'])
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");
        match token.as_str() {
            "ip_block" => Ok(Category::IpBlock),
            "domain_block" => Ok(Category::DomainBlock),
            "send_throttle" | "sender_throttle" => Ok(Category::SendThrottle),
            "server_error" => Ok(Category::ServerError),
            "config_error" => Ok(Category::ConfigError),
            "unknown_recipient" | "user_unknown" => Ok(Category::UnknownRecipient),
            "mailbox_full" | "user_mailbox_full" => Ok(Category::MailboxFull),
            "recipient_rate_limit" | "user_rate_limit" => Ok(Category::RecipientRateLimit),
            _ => Err(UnknownCategoryError(s.trim().to_string())),
        }
    }
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Legacy and canonical tokens accepted by [`Category::from_str`], longest
/// first so that scanning free text prefers the most specific match.
pub(crate) const CATEGORY_TOKENS: &[&str] = &[
    "recipient_rate_limit",
    "user_mailbox_full",
    "unknown_recipient",
    "user_rate_limit",
    "sender_throttle",
    "send_throttle",
    "domain_block",
    "server_error",
    "config_error",
    "mailbox_full",
    "user_unknown",
    "ip_block",
];
