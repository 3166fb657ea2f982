//! Mail folders

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MailError;

/// Folder an email is filed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Inbox,
    Sent,
    Archive,
    Spam,
    Trash,
}

impl Folder {
    pub const ALL: [Folder; 5] = [Folder::Inbox, Folder::Sent, Folder::Archive, Folder::Spam, Folder::Trash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Archive => "archive",
            Folder::Spam => "spam",
            Folder::Trash => "trash",
        }
    }

    pub fn is_trash(&self) -> bool {
        matches!(self, Folder::Trash)
    }

    /// Checks a plain folder move; entering the trash has its own operation
    pub fn ensure_move_target(&self) -> Result<(), MailError> {
        if self.is_trash() {
            return Err(MailError::ForbiddenMove(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Folder {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(Folder::Inbox),
            "sent" => Ok(Folder::Sent),
            "archive" => Ok(Folder::Archive),
            "spam" => Ok(Folder::Spam),
            "trash" => Ok(Folder::Trash),
            other => Err(MailError::UnknownFolder(other.to_string())),
        }
    }
}

impl TryFrom<String> for Folder {
    type Error = MailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for folder in Folder::ALL {
            assert_eq!(folder.as_str().parse::<Folder>().unwrap(), folder);
        }
        assert_eq!("INBOX".parse::<Folder>().unwrap(), Folder::Inbox);
        assert!("drafts".parse::<Folder>().is_err());
    }

    #[test]
    fn test_trash_is_not_a_move_target() {
        assert!(Folder::Trash.ensure_move_target().is_err());
        assert!(Folder::Archive.ensure_move_target().is_ok());
    }
}
