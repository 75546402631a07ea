//! Moderation cases
//!
//! A case is one audit record of a moderation action. Only the reason, the
//! responsible moderator and the audit message id change after creation.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Reason used when the invoker gives none
pub const DEFAULT_REASON: &str = "Unknown reason";

/// Kind of moderation action a case records
///
/// `Display` gives the title-cased form used in audit messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    #[display("Warn")]
    Warn,
    #[display("Mute")]
    Mute,
    #[display("Unmute")]
    Unmute,
    #[display("Kick")]
    Kick,
    #[display("Ban")]
    Ban,
    #[display("Unban")]
    Unban,
    #[display("Tempmute")]
    Tempmute,
    #[display("Tempban")]
    Tempban,
    #[display("Softban")]
    Softban,
    #[display("Forceban")]
    Forceban,
}

/// Audit record of one moderation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub number: u64,
    pub kind: CaseKind,
    pub target_user_id: u64,
    /// Display name at the time of the action
    pub target_username: Option<String>,
    pub reason: String,
    /// `None` until someone takes responsibility with the `reason` command
    pub moderator: Option<String>,
    /// Message in the audit channel, edited in place on amendment
    pub audit_message_id: Option<u64>,
}

impl Case {
    /// Render the case as the text posted to the audit channel
    #[must_use]
    pub fn render(&self) -> String {
        let user = match &self.target_username {
            Some(name) => format!("{name} ({})", self.target_user_id),
            None => self.target_user_id.to_string(),
        };
        let moderator = match &self.moderator {
            Some(moderator) => moderator.clone(),
            None => format!("Responsible moderator, do `.reason {} <reason>`", self.number),
        };

        format!(
            "**{}** | Case {}\n**User**: {user}\n**Reason**: {}\n**Responsible Mod**: {moderator}",
            self.kind, self.number, self.reason
        )
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Everything needed to open a case except its number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDraft {
    pub kind: CaseKind,
    pub target_user_id: u64,
    pub target_username: Option<String>,
    pub reason: String,
    pub moderator: Option<String>,
}

impl CaseDraft {
    pub fn new(kind: CaseKind, target_user_id: u64) -> Self {
        Self {
            kind,
            target_user_id,
            target_username: None,
            reason: DEFAULT_REASON.to_string(),
            moderator: None,
        }
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.target_username = Some(username.into());
        self
    }

    #[must_use]
    pub fn username_opt(mut self, username: Option<String>) -> Self {
        self.target_username = username;
        self
    }

    /// Set the reason, keeping the default when `reason` is blank
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if !reason.trim().is_empty() {
            self.reason = reason;
        }
        self
    }

    #[must_use]
    pub fn moderator(mut self, moderator: impl Into<String>) -> Self {
        self.moderator = Some(moderator.into());
        self
    }

    pub(crate) fn into_case(self, number: u64) -> Case {
        Case {
            number,
            kind: self.kind,
            target_user_id: self.target_user_id,
            target_username: self.target_username,
            reason: self.reason,
            moderator: self.moderator,
            audit_message_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Case {
        CaseDraft::new(CaseKind::Tempban, 1234)
            .username("spammer#0001")
            .reason("spam [1 day, 0:00:00]")
            .moderator("mod#0002")
            .into_case(5)
    }

    #[test]
    fn test_render_full_case() {
        assert_eq!(
            sample().render(),
            "**Tempban** | Case 5\n\
             **User**: spammer#0001 (1234)\n\
             **Reason**: spam [1 day, 0:00:00]\n\
             **Responsible Mod**: mod#0002"
        );
    }

    #[test]
    fn test_render_falls_back_without_username_or_moderator() {
        let case = CaseDraft::new(CaseKind::Ban, 99).into_case(3);
        let rendered = case.render();
        assert!(rendered.starts_with("**Ban** | Case 3\n**User**: 99\n"));
        assert!(rendered.contains("**Reason**: Unknown reason"));
        assert!(rendered.ends_with("Responsible moderator, do `.reason 3 <reason>`"));
    }

    #[test]
    fn test_blank_reason_keeps_default() {
        let draft = CaseDraft::new(CaseKind::Warn, 1).reason("   ");
        assert_eq!(draft.reason, DEFAULT_REASON);
    }

    #[test]
    fn test_kind_titles() {
        assert_eq!(CaseKind::Softban.to_string(), "Softban");
        assert_eq!(CaseKind::Tempmute.to_string(), "Tempmute");
        assert_eq!(CaseKind::Forceban.to_string(), "Forceban");
    }

    #[test]
    fn test_case_serialization() {
        let case = sample();
        let serialized = serde_yaml::to_string(&case).expect("Failed to serialize");
        assert!(serialized.contains("kind: tempban"));
        assert!(serialized.contains("number: 5"));

        let deserialized: Case = serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized, case);
    }
}
