//! Error types for the moderation engine
//!
//! Every fallible engine operation returns a [`ModerationResult`]. Gateway
//! refusals are mapped to [`ModerationError::PermissionDenied`] so commands can
//! tell the moderator which permission the bot is missing.

use thiserror::Error;

/// Errors that can occur during moderation operations
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The platform refused the mutation; carries the missing permission name
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Reason edit against a case number that does not exist
    #[error("Case {0} not found")]
    CaseNotFound(u64),

    /// Empty or unparseable duration token
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Temporary mute requested on a member that already carries the muted role
    #[error("Member {0} is already muted")]
    AlreadyMuted(u64),

    /// The guild state could not be written to the backend
    #[error("State could not be saved: {0}")]
    Persistence(String),

    /// Failed to get guild or member
    #[error("Failed to get guild or member: {0}")]
    GuildOrMemberNotFound(String),

    /// A channel the command names is not part of the guild
    #[error("Channel {0} not found in this guild")]
    ChannelNotFound(u64),

    /// Neither the guild nor the bot configuration names a muted role
    #[error("No muted role configured")]
    MutedRoleNotConfigured,

    /// A gateway call did not finish in time
    #[error("Gateway call timed out: {0}")]
    Timeout(String),

    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<serenity::Error>),

    /// Generic error
    #[error("Moderation error: {0}")]
    Other(String),
}

impl ModerationError {
    /// Map a serenity error, turning HTTP 403 into `PermissionDenied(permission)`
    #[must_use]
    pub fn from_gateway(error: serenity::Error, permission: &str) -> Self {
        if http_status(&error) == Some(403) {
            Self::PermissionDenied(permission.to_string())
        } else {
            Self::DiscordApi(Box::new(error))
        }
    }

    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Text shown to the moderator who invoked the failing command
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(permission) => {
                format!("Error: The bot does not have `{permission}` permission.")
            }
            Self::CaseNotFound(number) => format!("Case {number} not found."),
            Self::InvalidDuration(detail) => format!(
                "Invalid duration ({detail}). Duration must be in format X[m/h/d/w/mo/y] (e.g. `15d38m`)."
            ),
            Self::AlreadyMuted(_) => "Member is already muted.".to_string(),
            Self::Persistence(_) => {
                "Error: the moderation record could not be saved. Please try again.".to_string()
            }
            Self::GuildOrMemberNotFound(_) => "Error: that member could not be found.".to_string(),
            Self::ChannelNotFound(_) => "Error: that channel is not part of this server.".to_string(),
            Self::MutedRoleNotConfigured => {
                "Error: no muted role is configured. Use `mutedrole <role>` first.".to_string()
            }
            Self::Timeout(_) | Self::DiscordApi(_) | Self::Other(_) => {
                format!("Something went wrong: {self}")
            }
        }
    }
}

impl From<serenity::Error> for ModerationError {
    fn from(error: serenity::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

impl From<String> for ModerationError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

/// HTTP status code of a failed Discord request, if the error carries one
#[must_use]
pub fn http_status(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    }
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;
