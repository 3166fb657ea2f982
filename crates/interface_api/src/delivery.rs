//! Outbound mail
//!
//! Every message leaves through [`MailTransport`] first and is recorded in
//! the database only once the transport accepted it. A failed send therefore
//! leaves no trace in the sent folder and keeps the draft.
//!
//! Drafts and newsletters are claimed before the first copy goes out, so
//! two concurrent senders never deliver the same mail twice.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use core_kernel::{TenantContext, TenantId, UserId};
use domain_identity::display_name;
use domain_mail::{message_for_recipient, DraftInput, MailAddress, MailError, MailTransport, OutgoingMessage};
use infra_db::repositories::{EmailRow, NewsletterRow, ProfileRow, UserRow};

use crate::error::ApiError;
use crate::AppState;

/// Outcome of one newsletter run
#[derive(Debug)]
pub struct NewsletterDelivery {
    pub newsletter: NewsletterRow,
    pub delivered: usize,
    pub failed: usize,
}

/// What a maintenance pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub purged_sessions: u64,
    pub newsletters_sent: usize,
    pub newsletters_failed: usize,
}

/// Validates a message, stamps its Message-ID and hands it to the transport
pub async fn deliver(
    mailer: &dyn MailTransport,
    mut message: OutgoingMessage,
) -> Result<OutgoingMessage, MailError> {
    message.validate()?;
    message.assign_message_id();
    mailer.send(&message).await?;
    Ok(message)
}

/// The caller's address, named after their profile
pub fn sender_address(user: &UserRow, profile: &ProfileRow) -> Result<MailAddress, MailError> {
    let name = match profile.display_name.trim() {
        "" => display_name(&profile.first_name, &profile.last_name),
        name => name.to_string(),
    };
    MailAddress::new(&user.email, Some(name.as_str()).filter(|n| !n.is_empty()))
}

async fn sender_of(state: &AppState, ctx: &TenantContext) -> Result<MailAddress, ApiError> {
    let user = state.identity.get_user(ctx).await?;
    let profile = state.identity.get_profile(ctx).await?;
    Ok(sender_address(&user, &profile)?)
}

/// Message-ID of the email a draft answers
async fn reply_reference(
    state: &AppState,
    ctx: &TenantContext,
    input: &DraftInput,
) -> Result<Option<String>, ApiError> {
    match input.in_reply_to_email_id {
        Some(email_id) => Ok(state.emails.get(ctx, *email_id.as_uuid()).await?.message_id),
        None => Ok(None),
    }
}

async fn outgoing(state: &AppState, ctx: &TenantContext, input: DraftInput) -> Result<OutgoingMessage, ApiError> {
    let input = input.normalized()?;
    let from = sender_of(state, ctx).await?;
    let in_reply_to = reply_reference(state, ctx, &input).await?;
    Ok(input.into_outgoing(from, in_reply_to))
}

/// Sends a composed message and files it under `sent`
pub async fn send_message(state: &AppState, ctx: &TenantContext, input: DraftInput) -> Result<EmailRow, ApiError> {
    let message = outgoing(state, ctx, input).await?;
    let message = deliver(state.mailer.as_ref(), message).await?;
    let email = state.emails.store_sent(ctx, &message).await?;
    info!(email_id = %email.id, recipients = message.recipient_count(), "Email sent");
    Ok(email)
}

/// Sends a saved draft; the draft stays locked until the message is stored
/// and the draft deleted
pub async fn send_draft(state: &AppState, ctx: &TenantContext, draft_id: Uuid) -> Result<EmailRow, ApiError> {
    let sending = state.drafts.begin_send(ctx, draft_id).await?;
    let message = outgoing(state, ctx, sending.draft().to_input()).await?;
    let message = deliver(state.mailer.as_ref(), message).await?;
    Ok(sending.complete(&message).await?)
}

/// Sends one personalized copy of a newsletter to each audience member.
///
/// The newsletter is claimed first; a second send of the same newsletter is
/// a conflict. It is marked sent with the number of copies the transport
/// accepted. A run that delivers nothing returns it to draft.
pub async fn send_newsletter(
    state: &AppState,
    ctx: &TenantContext,
    newsletter_id: Uuid,
) -> Result<NewsletterDelivery, ApiError> {
    let newsletter = state.newsletters.claim(ctx, newsletter_id).await?;
    deliver_claimed(state, ctx, newsletter).await
}

async fn deliver_claimed(
    state: &AppState,
    ctx: &TenantContext,
    newsletter: NewsletterRow,
) -> Result<NewsletterDelivery, ApiError> {
    let newsletter_id = newsletter.id;
    let (delivered, failed) = match fan_out(state, ctx, &newsletter).await {
        Ok(counts) => counts,
        Err(e) => {
            release(state, ctx, newsletter_id).await;
            return Err(e);
        }
    };

    let newsletter = state
        .newsletters
        .mark_sent(ctx, newsletter_id, delivered as i64)
        .await
        .inspect_err(|e| error!(%newsletter_id, delivered, error = %e, "Delivered newsletter not marked sent"))?;
    info!(%newsletter_id, delivered, failed, "Newsletter sent");
    Ok(NewsletterDelivery {
        newsletter,
        delivered,
        failed,
    })
}

async fn release(state: &AppState, ctx: &TenantContext, newsletter_id: Uuid) {
    if let Err(e) = state.newsletters.release(ctx, newsletter_id).await {
        error!(%newsletter_id, error = %e, "Undelivered newsletter left in sending state");
    }
}

/// Hands a copy per audience member to the transport; returns how many were
/// delivered and how many failed
async fn fan_out(
    state: &AppState,
    ctx: &TenantContext,
    newsletter: &NewsletterRow,
) -> Result<(usize, usize), ApiError> {
    let audience = state.newsletters.audience(ctx, newsletter.audience_tag_id).await?;
    if audience.is_empty() {
        return Err(ApiError::Validation("The newsletter has no recipients".to_string()));
    }

    let tenant = state.identity.get_tenant(ctx).await?;
    let from = state.config.sender(&tenant.name)?;

    let (mut delivered, mut failed) = (0usize, 0usize);
    for member in &audience {
        let name = member.name();
        let copy = MailAddress::new(&member.email, name.as_deref()).map(|recipient| {
            message_for_recipient(
                &from,
                recipient,
                &newsletter.subject,
                newsletter.body_text.as_deref(),
                newsletter.body_html.as_deref(),
            )
        });
        match deliver_copy(copy, state.mailer.as_ref()).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(newsletter_id = %newsletter.id, person_id = %member.person_id, error = %e, "Newsletter copy not delivered");
                failed += 1;
            }
        }
    }

    if delivered == 0 {
        return Err(MailError::transport(
            state.mailer.name(),
            format!("none of the {} newsletter copies could be delivered", failed),
        )
        .into());
    }
    Ok((delivered, failed))
}

async fn deliver_copy(
    copy: Result<OutgoingMessage, MailError>,
    mailer: &dyn MailTransport,
) -> Result<(), MailError> {
    deliver(mailer, copy?).await.map(|_| ())
}

/// Claims and sends every scheduled newsletter whose time has come, on
/// behalf of its author. A newsletter that fails goes back to draft and is
/// not retried.
pub async fn dispatch_due(state: &AppState, now: DateTime<Utc>) -> Result<(usize, usize), ApiError> {
    let due = state.newsletters.claim_due(now).await?;
    let (mut sent, mut failed) = (0, 0);
    for item in due {
        let ctx = TenantContext::new(TenantId::from_uuid(item.tenant_id), UserId::from_uuid(item.author_id));
        let result = match state.newsletters.get(&ctx, item.id).await {
            Ok(newsletter) => deliver_claimed(state, &ctx, newsletter).await,
            Err(e) => {
                release(state, &ctx, item.id).await;
                Err(e.into())
            }
        };
        match result {
            Ok(_) => sent += 1,
            Err(e) => {
                warn!(newsletter_id = %item.id, tenant_id = %item.tenant_id, error = %e, "Scheduled newsletter failed");
                failed += 1;
            }
        }
    }
    Ok((sent, failed))
}

/// Purges expired sessions and dispatches due newsletters
pub async fn run_maintenance(state: &AppState, now: DateTime<Utc>) -> Result<MaintenanceReport, ApiError> {
    let purged_sessions = state.identity.purge_expired_sessions(now).await?;
    let (newsletters_sent, newsletters_failed) = dispatch_due(state, now).await?;
    Ok(MaintenanceReport {
        purged_sessions,
        newsletters_sent,
        newsletters_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_identity::Role;
    use domain_mail::RecordingTransport;

    fn message(to: &str) -> OutgoingMessage {
        OutgoingMessage {
            from: MailAddress::new("organizer@example.org", Some("Organizer")).unwrap(),
            to: vec![MailAddress::new(to, None).unwrap()],
            cc: vec![],
            bcc: vec![],
            subject: "Canvass on Saturday".to_string(),
            body_text: Some("Meet at the library.".to_string()),
            body_html: None,
            in_reply_to: None,
            message_id: None,
        }
    }

    #[tokio::test]
    async fn test_deliver_stamps_message_id() {
        let mailer = RecordingTransport::new();
        let sent = deliver(&mailer, message("volunteer@example.org")).await.unwrap();

        assert!(sent.message_id.is_some());
        let recorded = mailer.sent().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].message_id, sent.message_id);
    }

    #[tokio::test]
    async fn test_deliver_rejects_invalid_messages() {
        let mailer = RecordingTransport::new();
        let mut invalid = message("volunteer@example.org");
        invalid.to.clear();

        assert!(deliver(&mailer, invalid).await.is_err());
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_deliver_surfaces_transport_failures() {
        let mailer = RecordingTransport::new();
        mailer.fail_for("bounce@example.org").await;

        let err = deliver(&mailer, message("bounce@example.org")).await.unwrap_err();
        assert!(matches!(err, MailError::Transport { .. }));
    }

    #[test]
    fn test_sender_address_uses_profile_name() {
        let now = Utc::now();
        let user = UserRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "ella@example.org".to_string(),
            password_hash: String::new(),
            role: Role::Member,
            is_active: true,
            last_sign_in_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut profile = ProfileRow {
            id: Uuid::new_v4(),
            tenant_id: user.tenant_id,
            user_id: user.id,
            first_name: "Ella".to_string(),
            last_name: "Baker".to_string(),
            display_name: String::new(),
            avatar_url: None,
            timezone: "UTC".to_string(),
            signature: None,
            created_at: now,
            updated_at: now,
        };

        let from = sender_address(&user, &profile).unwrap();
        assert_eq!(from.name.as_deref(), Some("Ella Baker"));

        profile.display_name = "Miss Baker".to_string();
        let from = sender_address(&user, &profile).unwrap();
        assert_eq!(from.name.as_deref(), Some("Miss Baker"));
        assert_eq!(from.address, "ella@example.org");
    }
}
