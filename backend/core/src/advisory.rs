//! # Advisory Check
//!
//! Soft check run before publishing, on the client side of the extension.
//!
//! Unlike [`crate::build::validate_strict`] it never consults the catalog. It only catches a
//! republish of the live build, a killer without a name, and empty slots. Empty slots are a
//! warning: publishing the same build again goes through.
use serde::{Deserialize, Serialize};

use crate::build::{Build, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
}

impl BuildMessage {
    fn error(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            content: content.into(),
        }
    }

    fn warning(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Warning,
            content: content.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

fn count(amount: usize, noun: &str) -> String {
    let suffix = if amount == 1 { "" } else { "s" };

    format!("{amount} empty {noun}{suffix}")
}

pub fn check_advisory(candidate: &Build, live: Option<&Build>) -> Option<BuildMessage> {
    if live == Some(candidate) {
        return Some(BuildMessage::error(
            "This build is the same as the current build",
        ));
    }

    let mut empty_addons = 0;
    let mut empty_perks = 0;

    if candidate.mode == Mode::Killer {
        if candidate.killer_name.as_deref().is_none_or(str::is_empty) {
            return Some(BuildMessage::error("You must set the killer's name"));
        }

        empty_addons = match &candidate.addons {
            Some(addons) => addons.iter().filter(|addon| addon.is_none()).count(),
            None => crate::build::ADDON_SLOTS,
        };
    }

    if candidate.mode != Mode::NotPlaying {
        empty_perks = candidate.perks.iter().filter(|perk| perk.is_none()).count();
    }

    let summary = match (empty_perks, empty_addons) {
        (0, 0) => return None,
        (perks, 0) => count(perks, "perk"),
        (0, addons) => count(addons, "addon"),
        (perks, addons) => format!("{} and {}", count(perks, "perk"), count(addons, "addon")),
    };

    Some(BuildMessage::warning(format!(
        "You have {summary}. If this is correct, please click Publish again."
    )))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Blocked(BuildMessage),
    Warned(BuildMessage),
    Proceed,
}

/// Remembers the last build a warning was shown for, so submitting it again confirms it.
#[derive(Debug, Default)]
pub struct AdvisoryGate {
    warned: Option<Build>,
}

impl AdvisoryGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, candidate: &Build, live: Option<&Build>) -> Submission {
        let message = match check_advisory(candidate, live) {
            None => {
                self.warned = None;
                return Submission::Proceed;
            }
            Some(message) => message,
        };

        if message.is_blocking() {
            self.warned = None;
            return Submission::Blocked(message);
        }

        if self.warned.as_ref() == Some(candidate) {
            self.warned = None;
            return Submission::Proceed;
        }

        self.warned = Some(candidate.clone());
        Submission::Warned(message)
    }
}
