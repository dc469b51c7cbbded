use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A notification delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Telegram,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Telegram => "TELEGRAM",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel selection for experiments and filters. `Both` means "no channel restriction".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelTarget {
    Email,
    Telegram,
    Both,
}

impl ChannelTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelTarget::Email => "EMAIL",
            ChannelTarget::Telegram => "TELEGRAM",
            ChannelTarget::Both => "BOTH",
        }
    }

    /// The single channel this target narrows to, if any.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            ChannelTarget::Email => Some(Channel::Email),
            ChannelTarget::Telegram => Some(Channel::Telegram),
            ChannelTarget::Both => None,
        }
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown channel '{0}' (expected EMAIL, TELEGRAM or BOTH)")]
pub struct ParseChannelError(pub String);

impl FromStr for ChannelTarget {
    type Err = ParseChannelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(ChannelTarget::Email),
            "TELEGRAM" => Ok(ChannelTarget::Telegram),
            "BOTH" => Ok(ChannelTarget::Both),
            _ => Err(ParseChannelError(value.to_string())),
        }
    }
}
