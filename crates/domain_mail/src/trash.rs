//! Trash rules
//!
//! Trashing is a two-step soft delete: remember the current folder, then
//! file the email under `trash`. Restoring reverses both steps. The database
//! layer performs the steps in one transaction; this module decides whether
//! each step is allowed and where things go.

use crate::error::MailError;
use crate::folder::Folder;

/// What a trash operation must record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrashDecision {
    /// Folder to restore into later
    pub previous_folder: Folder,
}

/// Decides how to trash an email currently filed in `current`
pub fn plan_trash(current: Folder) -> Result<TrashDecision, MailError> {
    if current.is_trash() {
        return Err(MailError::AlreadyTrashed);
    }
    Ok(TrashDecision {
        previous_folder: current,
    })
}

/// Folder a trashed email returns to.
///
/// A recorded folder of `trash` cannot come from [`plan_trash`]; such rows
/// are treated as inbox mail.
pub fn restore_target(previous_folder: Option<Folder>) -> Folder {
    match previous_folder {
        Some(folder) if !folder.is_trash() => folder,
        _ => Folder::Inbox,
    }
}

/// Permanent deletion is only allowed from the trash
pub fn ensure_purgeable(current: Folder) -> Result<(), MailError> {
    if !current.is_trash() {
        return Err(MailError::NotInTrash(current.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trash_then_restore_returns_home() {
        for folder in [Folder::Inbox, Folder::Sent, Folder::Archive, Folder::Spam] {
            let decision = plan_trash(folder).unwrap();
            assert_eq!(restore_target(Some(decision.previous_folder)), folder);
        }
    }

    #[test]
    fn test_cannot_trash_twice() {
        assert!(matches!(plan_trash(Folder::Trash), Err(MailError::AlreadyTrashed)));
    }

    #[test]
    fn test_restore_without_record_goes_to_inbox() {
        assert_eq!(restore_target(None), Folder::Inbox);
        assert_eq!(restore_target(Some(Folder::Trash)), Folder::Inbox);
    }

    #[test]
    fn test_purge_only_from_trash() {
        assert!(ensure_purgeable(Folder::Trash).is_ok());
        let err = ensure_purgeable(Folder::Inbox).unwrap_err();
        assert!(err.is_conflict());
    }
}
