use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consent::ConsentCategories;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConsentEventKind {
    #[serde(rename = "consent:accepted")]
    ConsentAccepted,
    #[serde(rename = "consent:rejected")]
    ConsentRejected,
    #[serde(rename = "consent:updated")]
    ConsentUpdated,
    #[serde(rename = "banner:shown")]
    BannerShown,
    #[serde(rename = "banner:hidden")]
    BannerHidden,
    #[serde(rename = "settings:opened")]
    SettingsOpened,
    #[serde(rename = "settings:closed")]
    SettingsClosed,
}

impl ConsentEventKind {
    pub const ALL: [Self; 7] = [
        Self::ConsentAccepted,
        Self::ConsentRejected,
        Self::ConsentUpdated,
        Self::BannerShown,
        Self::BannerHidden,
        Self::SettingsOpened,
        Self::SettingsClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsentAccepted => "consent:accepted",
            Self::ConsentRejected => "consent:rejected",
            Self::ConsentUpdated => "consent:updated",
            Self::BannerShown => "banner:shown",
            Self::BannerHidden => "banner:hidden",
            Self::SettingsOpened => "settings:opened",
            Self::SettingsClosed => "settings:closed",
        }
    }
}

impl fmt::Display for ConsentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown consent event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for ConsentEventKind {
    type Err = UnknownEventKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownEventKind(value.to_string()))
    }
}

/// One emitted event. Consent events carry the mapping at emission time; visibility events carry
/// none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentEvent {
    pub kind: ConsentEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<ConsentCategories>,
}

impl ConsentEvent {
    pub fn new(kind: ConsentEventKind) -> Self {
        Self {
            kind,
            categories: None,
        }
    }

    pub fn with_categories(kind: ConsentEventKind, categories: ConsentCategories) -> Self {
        Self {
            kind,
            categories: Some(categories),
        }
    }
}
