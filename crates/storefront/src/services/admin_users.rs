//! Rules for admins managing other accounts.

use oncemore_core::UserId;

use crate::error::AppError;

/// What an admin is trying to do to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    ChangeRole,
    Delete,
}

/// Reject an admin acting on their own account.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when `actor` and `target` are the same user.
pub fn ensure_not_self(actor: UserId, target: UserId, action: AccountAction) -> Result<(), AppError> {
    if actor != target {
        return Ok(());
    }
    let message = match action {
        AccountAction::ChangeRole => "Cannot change your own role.",
        AccountAction::Delete => "Cannot delete your own account.",
    };
    Err(AppError::BadRequest(message.to_string()))
}
