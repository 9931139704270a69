use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Source platform of a saved link.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Website,
    Facebook,
    Twitter,
    Instagram,
    Linkedin,
    Youtube,
    Github,
    Pinterest,
    Tiktok,
    Reddit,
    Other,
}

impl LinkType {
    pub const ALL: [LinkType; 11] = [
        LinkType::Website,
        LinkType::Facebook,
        LinkType::Twitter,
        LinkType::Instagram,
        LinkType::Linkedin,
        LinkType::Youtube,
        LinkType::Github,
        LinkType::Pinterest,
        LinkType::Tiktok,
        LinkType::Reddit,
        LinkType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Website => "website",
            LinkType::Facebook => "facebook",
            LinkType::Twitter => "twitter",
            LinkType::Instagram => "instagram",
            LinkType::Linkedin => "linkedin",
            LinkType::Youtube => "youtube",
            LinkType::Github => "github",
            LinkType::Pinterest => "pinterest",
            LinkType::Tiktok => "tiktok",
            LinkType::Reddit => "reddit",
            LinkType::Other => "other",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownLinkType(pub String);

impl fmt::Display for UnknownLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown link type {:?}", self.0)
    }
}

impl std::error::Error for UnknownLinkType {}

impl FromStr for LinkType {
    type Err = UnknownLinkType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLinkType(s.to_string()))
    }
}

// First match wins.
const HOST_PATTERNS: &[(&[&str], LinkType)] = &[
    (&["facebook.com", "fb.com"], LinkType::Facebook),
    (&["twitter.com", "x.com"], LinkType::Twitter),
    (&["instagram.com"], LinkType::Instagram),
    (&["linkedin.com"], LinkType::Linkedin),
    (&["youtube.com", "youtu.be"], LinkType::Youtube),
    (&["github.com"], LinkType::Github),
    (&["pinterest.com"], LinkType::Pinterest),
    (&["tiktok.com"], LinkType::Tiktok),
    (&["reddit.com"], LinkType::Reddit),
];

/// Classify a URL by substring match on the lower-cased string. Never fails.
pub fn classify(url: &str) -> LinkType {
    let lower = url.to_lowercase();
    HOST_PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or(LinkType::Website)
}
