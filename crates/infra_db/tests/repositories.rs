//! Repository integration tests
//!
//! Each test signs up its own organization on a shared PostgreSQL container,
//! so tests never observe each other's rows. They need Docker and are
//! ignored by default: `cargo test -p infra_db -- --ignored`.

use chrono::{Duration, Utc};
use uuid::Uuid;

use core_kernel::{ListOptions, SortOrder, TenantContext, TenantId, UserId};
use domain_contacts::TagTarget;
use domain_identity::hash_password;
use domain_mail::{Folder, NewsletterStatus};
use infra_db::repositories::{
    DraftRepository, EmailRepository, HouseholdRepository, IdentityRepository, NewSession,
    NewsletterRepository, PersonRepository, TagRepository,
};
use infra_db::DatabaseError;
use test_utils::{
    assert_page, assert_sorted_by, get_shared_test_database, ContactFixtures, MailFixtures,
    TestHouseholdBuilder, TestIncomingEmailBuilder, TestOutgoingMessageBuilder, TestPersonBuilder,
    TestSignUpBuilder,
};

fn new_session() -> NewSession {
    NewSession {
        user_agent: Some("integration-test".to_string()),
        ip_address: None,
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Signs up a fresh organization and returns its owner's context
async fn organization(pool: &sqlx::PgPool) -> TenantContext {
    let sign_up = TestSignUpBuilder::new().build().validate().unwrap();
    let hash = hash_password(&sign_up.password).unwrap();
    let records = IdentityRepository::new(pool.clone())
        .sign_up(&sign_up, &hash, new_session())
        .await
        .unwrap();
    TenantContext::new(
        TenantId::from_uuid(records.tenant.id),
        UserId::from_uuid(records.user.id),
    )
}

mod identity {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_sign_up_creates_tenant_owner_and_session() {
        let db = get_shared_test_database().await;
        let repo = IdentityRepository::new(db.pool().clone());
        let sign_up = TestSignUpBuilder::new().build().validate().unwrap();
        let hash = hash_password(&sign_up.password).unwrap();

        let records = repo.sign_up(&sign_up, &hash, new_session()).await.unwrap();

        assert_eq!(records.tenant.slug, sign_up.tenant.slug);
        assert!(records.user.role.is_admin());
        assert_eq!(records.profile.user_id, records.user.id);
        assert_eq!(records.session.user_id, records.user.id);

        let found = repo.find_user_by_email(&sign_up.email).await.unwrap().unwrap();
        assert_eq!(found.id, records.user.id);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_duplicate_email_is_rejected() {
        let db = get_shared_test_database().await;
        let repo = IdentityRepository::new(db.pool().clone());
        let first = TestSignUpBuilder::new().build().validate().unwrap();
        repo.sign_up(&first, "hash", new_session()).await.unwrap();

        let second = TestSignUpBuilder::new()
            .with_email(&first.email.to_uppercase())
            .build()
            .validate()
            .unwrap();
        let err = repo.sign_up(&second, "hash", new_session()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateEntry(_)), "{:?}", err);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_expired_sessions_are_not_active() {
        let db = get_shared_test_database().await;
        let repo = IdentityRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let user = repo.get_user(&ctx).await.unwrap();

        let session = repo.start_session(&user, new_session()).await.unwrap();
        let now = Utc::now();
        assert!(repo.find_active_session(session.id, user.id, now).await.unwrap().is_some());
        assert!(repo
            .find_active_session(session.id, user.id, now + Duration::hours(2))
            .await
            .unwrap()
            .is_none());

        repo.end_session(&ctx, session.id).await.unwrap();
        assert!(repo.end_session(&ctx, session.id).await.unwrap_err().is_not_found());
    }
}

mod contacts {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_person_crud_round_trip() {
        let db = get_shared_test_database().await;
        let repo = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let created = repo.create(&ctx, &ContactFixtures::person().normalized()).await.unwrap();
        assert_eq!(created.first_name, "Ann");

        let mut input = ContactFixtures::person();
        input.party_affiliation = Some("Independent".to_string());
        let updated = repo.update(&ctx, created.id, &input.normalized()).await.unwrap();
        assert_eq!(updated.party_affiliation.as_deref(), Some("Independent"));

        repo.delete(&ctx, created.id).await.unwrap();
        assert!(repo.get(&ctx, created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_tenants_are_isolated() {
        let db = get_shared_test_database().await;
        let repo = PersonRepository::new(db.pool().clone());
        let ours = organization(db.pool()).await;
        let theirs = organization(db.pool()).await;

        let person = repo.create(&ours, &TestPersonBuilder::new().build()).await.unwrap();

        assert!(repo.get(&theirs, person.id).await.unwrap_err().is_not_found());
        assert!(repo.delete(&theirs, person.id).await.unwrap_err().is_not_found());
        let page = repo.list(&theirs, &ListOptions::default()).await.unwrap();
        assert_page(&page, 0, 1, 0);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_list_pages_sorts_and_searches() {
        let db = get_shared_test_database().await;
        let repo = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        for last_name in ["Young", "Adams", "Baker", "Carter", "Diaz"] {
            let person = TestPersonBuilder::new()
                .with_name("Sam", last_name)
                .with_email(&format!("{}@example.org", last_name.to_lowercase()))
                .build();
            repo.create(&ctx, &person).await.unwrap();
        }

        let options = ListOptions::new(1, 2).sorted_by("last_name", SortOrder::Asc);
        let first = repo.list(&ctx, &options).await.unwrap();
        assert_page(&first, 5, 1, 2);
        assert_eq!(first.items[0].last_name, "Adams");
        assert!(first.has_next());

        let last = repo.list(&ctx, &ListOptions::new(3, 2).sorted_by("last_name", SortOrder::Asc)).await.unwrap();
        assert_page(&last, 5, 3, 1);
        assert_eq!(last.items[0].last_name, "Young");

        let all = repo.list(&ctx, &ListOptions::new(1, 10).sorted_by("last_name", SortOrder::Asc)).await.unwrap();
        assert_sorted_by(&all.items, |p| p.last_name.clone());

        let found = repo.list(&ctx, &ListOptions::default().with_search("bak")).await.unwrap();
        assert_page(&found, 1, 1, 1);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_unknown_filter_is_rejected() {
        let db = get_shared_test_database().await;
        let repo = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let options = ListOptions::default().with_filter("password", "x");
        let err = repo.list(&ctx, &options).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidQuery(_)), "{:?}", err);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_deleting_household_detaches_members() {
        let db = get_shared_test_database().await;
        let households = HouseholdRepository::new(db.pool().clone());
        let persons = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let household = households.create(&ctx, &TestHouseholdBuilder::new().build()).await.unwrap();
        let person = persons.create(&ctx, &TestPersonBuilder::new().build()).await.unwrap();
        let member = households.add_member(&ctx, household.id, person.id).await.unwrap();
        assert_eq!(member.household_id, Some(household.id));
        assert_eq!(households.get(&ctx, household.id).await.unwrap().member_count, 1);

        households.delete(&ctx, household.id).await.unwrap();
        let person = persons.get(&ctx, person.id).await.unwrap();
        assert_eq!(person.household_id, None);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_tagging_is_idempotent() {
        let db = get_shared_test_database().await;
        let tags = TagRepository::new(db.pool().clone());
        let persons = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let tag = tags.create(&ctx, &ContactFixtures::tag().normalized()).await.unwrap();
        let person = persons.create(&ctx, &TestPersonBuilder::new().build()).await.unwrap();

        tags.tag(&ctx, TagTarget::Person, person.id, tag.id).await.unwrap();
        tags.tag(&ctx, TagTarget::Person, person.id, tag.id).await.unwrap();
        assert_eq!(tags.get(&ctx, tag.id).await.unwrap().person_count, 1);

        let tagged = tags.persons_with_tag(&ctx, tag.id, ListOptions::default()).await.unwrap();
        assert_page(&tagged, 1, 1, 1);

        tags.untag(&ctx, TagTarget::Person, person.id, tag.id).await.unwrap();
        let err = tags.untag(&ctx, TagTarget::Person, person.id, tag.id).await.unwrap_err();
        assert!(err.is_not_found());

        let err = tags.create(&ctx, &ContactFixtures::tag().normalized()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateEntry(_)), "{:?}", err);
    }
}

mod mail {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_ingested_email_keeps_its_parts() {
        let db = get_shared_test_database().await;
        let repo = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let detail = repo.ingest(&ctx, &TestIncomingEmailBuilder::new().build()).await.unwrap();

        assert_eq!(detail.email.folder, Folder::Inbox);
        assert!(detail.email.has_attachments);
        assert_eq!(detail.recipients.len(), 1);
        assert_eq!(detail.headers.len(), 1);
        assert_eq!(detail.attachments.len(), 1);

        let read = repo.set_flags(&ctx, detail.email.id, Some(true), None).await.unwrap();
        assert!(read.is_read);
        assert!(!read.is_starred);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_ingested_addresses_are_normalized() {
        let db = get_shared_test_database().await;
        let repo = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let mut email = TestIncomingEmailBuilder::new().build();
        email.from = domain_mail::MailAddress {
            address: "  Voter@Example.ORG ".to_string(),
            name: Some(" Vera ".to_string()),
        };
        email.to[0].address = format!(" {} ", email.to[0].address.to_uppercase());

        let detail = repo.ingest(&ctx, &email).await.unwrap();
        assert_eq!(detail.email.from_address, "voter@example.org");
        assert_eq!(detail.email.from_name.as_deref(), Some("Vera"));
        assert_eq!(detail.recipients[0].address, email.to[0].address.trim().to_lowercase());

        email.from.address = "nobody".to_string();
        assert!(matches!(repo.ingest(&ctx, &email).await.unwrap_err(), DatabaseError::InvalidQuery(_)));
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_trash_restore_and_purge() {
        let db = get_shared_test_database().await;
        let repo = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let sent = repo.store_sent(&ctx, &TestOutgoingMessageBuilder::new().build()).await.unwrap();
        assert_eq!(sent.folder, Folder::Sent);

        let trashed = repo.trash(&ctx, sent.id).await.unwrap();
        assert_eq!(trashed.folder, Folder::Trash);
        assert_eq!(
            repo.detail(&ctx, sent.id).await.unwrap().previous_folder,
            Some(Folder::Sent)
        );
        assert!(matches!(repo.trash(&ctx, sent.id).await.unwrap_err(), DatabaseError::Conflict(_)));

        let restored = repo.restore(&ctx, sent.id).await.unwrap();
        assert_eq!(restored.folder, Folder::Sent);
        assert!(repo.restore(&ctx, sent.id).await.unwrap_err().is_not_found());
        assert!(matches!(repo.purge(&ctx, sent.id).await.unwrap_err(), DatabaseError::Conflict(_)));

        repo.trash(&ctx, sent.id).await.unwrap();
        repo.purge(&ctx, sent.id).await.unwrap();
        assert!(repo.get(&ctx, sent.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_bulk_trash_skips_trashed_and_rejects_unknown() {
        let db = get_shared_test_database().await;
        let repo = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let a = repo.ingest(&ctx, &TestIncomingEmailBuilder::new().build()).await.unwrap().email.id;
        let b = repo.ingest(&ctx, &TestIncomingEmailBuilder::new().build()).await.unwrap().email.id;
        repo.trash(&ctx, a).await.unwrap();

        assert!(repo.trash_many(&ctx, &[a, Uuid::new_v4()]).await.unwrap_err().is_not_found());
        assert_eq!(repo.get(&ctx, b).await.unwrap().folder, Folder::Inbox);

        assert_eq!(repo.trash_many(&ctx, &[a, b, b]).await.unwrap(), 1);
        assert_eq!(repo.empty_trash(&ctx).await.unwrap(), 2);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_mailboxes_are_private_to_their_owner() {
        let db = get_shared_test_database().await;
        let repo = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let email = repo.ingest(&ctx, &TestIncomingEmailBuilder::new().build()).await.unwrap();

        let colleague = TenantContext::new(ctx.tenant_id, UserId::new());
        assert!(repo.get(&colleague, email.email.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_sending_a_draft_replaces_it_with_a_sent_email() {
        let db = get_shared_test_database().await;
        let drafts = DraftRepository::new(db.pool().clone());
        let emails = EmailRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let draft = drafts.create(&ctx, &MailFixtures::draft()).await.unwrap();
        assert_eq!(draft.to_input().to, MailFixtures::draft().to);

        let sending = drafts.begin_send(&ctx, draft.id).await.unwrap();
        let message = sending.draft().to_input().into_outgoing(MailFixtures::sender(), None);
        let sent = sending.complete(&message).await.unwrap();

        assert_eq!(emails.get(&ctx, sent.id).await.unwrap().folder, Folder::Sent);
        assert!(drafts.get(&ctx, draft.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_a_draft_is_sent_only_once() {
        let db = get_shared_test_database().await;
        let drafts = DraftRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let draft = drafts.create(&ctx, &MailFixtures::draft()).await.unwrap();

        let sending = drafts.begin_send(&ctx, draft.id).await.unwrap();
        let second = tokio::time::timeout(std::time::Duration::from_millis(200), drafts.begin_send(&ctx, draft.id)).await;
        assert!(second.is_err(), "a locked draft must not be handed out twice");

        let message = sending.draft().to_input().into_outgoing(MailFixtures::sender(), None);
        sending.complete(&message).await.unwrap();
        assert!(drafts.begin_send(&ctx, draft.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_abandoned_send_keeps_the_draft() {
        let db = get_shared_test_database().await;
        let drafts = DraftRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let draft = drafts.create(&ctx, &MailFixtures::draft()).await.unwrap();

        drop(drafts.begin_send(&ctx, draft.id).await.unwrap());

        assert_eq!(drafts.get(&ctx, draft.id).await.unwrap().id, draft.id);
        assert!(drafts.begin_send(&ctx, draft.id).await.is_ok());
    }
}

mod newsletters {
    use super::*;

    /// A send time no due-claim in these tests reaches
    fn far_future(now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
        now + Duration::days(1000)
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_newsletter_lifecycle() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let now = Utc::now();

        let newsletter = repo.create(&ctx, &MailFixtures::newsletter()).await.unwrap();
        assert_eq!(newsletter.status, NewsletterStatus::Draft);

        let scheduled = repo.schedule(&ctx, newsletter.id, far_future(now), now).await.unwrap();
        assert_eq!(scheduled.status, NewsletterStatus::Scheduled);
        assert!(repo.update(&ctx, newsletter.id, &MailFixtures::newsletter()).await.is_err());

        let claimed = repo.claim(&ctx, newsletter.id).await.unwrap();
        assert_eq!(claimed.status, NewsletterStatus::Sending);

        let sent = repo.mark_sent(&ctx, newsletter.id, 3).await.unwrap();
        assert_eq!(sent.status, NewsletterStatus::Sent);
        assert_eq!(sent.recipient_count, 3);

        assert!(matches!(repo.mark_sent(&ctx, newsletter.id, 3).await.unwrap_err(), DatabaseError::Conflict(_)));
        assert!(matches!(repo.claim(&ctx, newsletter.id).await.unwrap_err(), DatabaseError::Conflict(_)));
        assert!(repo.delete(&ctx, newsletter.id).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_second_claim_conflicts() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let now = Utc::now();

        let newsletter = repo.create(&ctx, &MailFixtures::newsletter()).await.unwrap();
        repo.schedule(&ctx, newsletter.id, far_future(now), now).await.unwrap();

        let claimed = repo.claim(&ctx, newsletter.id).await.unwrap();
        assert_eq!(claimed.status, NewsletterStatus::Sending);
        assert!(matches!(repo.claim(&ctx, newsletter.id).await.unwrap_err(), DatabaseError::Conflict(_)));
        assert!(repo.delete(&ctx, newsletter.id).await.is_err());
        assert!(repo.unschedule(&ctx, newsletter.id).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_due_newsletters_are_claimed_once() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let now = Utc::now();

        let newsletter = repo.create(&ctx, &MailFixtures::newsletter()).await.unwrap();
        repo.schedule(&ctx, newsletter.id, now + Duration::minutes(5), now).await.unwrap();

        // Nothing else in this suite schedules before far_future, so only this
        // test's rows are due here.
        let later = now + Duration::hours(1);
        let (first, second) = tokio::join!(repo.claim_due(later), repo.claim_due(later));
        let claims = first
            .unwrap()
            .into_iter()
            .chain(second.unwrap())
            .filter(|d| d.id == newsletter.id)
            .count();
        assert_eq!(claims, 1);
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_release_returns_newsletter_to_draft() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;
        let now = Utc::now();

        let newsletter = repo.create(&ctx, &MailFixtures::newsletter()).await.unwrap();
        repo.schedule(&ctx, newsletter.id, far_future(now), now).await.unwrap();
        assert!(repo.release(&ctx, newsletter.id).await.is_err());

        repo.claim(&ctx, newsletter.id).await.unwrap();
        let released = repo.release(&ctx, newsletter.id).await.unwrap();
        assert_eq!(released.status, NewsletterStatus::Draft);
        assert_eq!(released.scheduled_for, None);
        assert!(repo.update(&ctx, newsletter.id, &MailFixtures::newsletter()).await.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_audience_excludes_unreachable_and_deduplicates() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let persons = PersonRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        persons.create(&ctx, &TestPersonBuilder::new().with_email("shared@example.org").build()).await.unwrap();
        persons.create(&ctx, &TestPersonBuilder::new().with_email("SHARED@example.org").build()).await.unwrap();
        persons.create(&ctx, &TestPersonBuilder::new().without_email().build()).await.unwrap();
        persons.create(&ctx, &TestPersonBuilder::new().do_not_contact().build()).await.unwrap();

        let audience = repo.audience(&ctx, None).await.unwrap();
        assert_eq!(audience.len(), 1);
        assert_eq!(audience[0].email, "shared@example.org");
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn test_unknown_audience_tag_is_not_found() {
        let db = get_shared_test_database().await;
        let repo = NewsletterRepository::new(db.pool().clone());
        let ctx = organization(db.pool()).await;

        let mut input = MailFixtures::newsletter();
        input.audience_tag_id = Some(core_kernel::TagId::new());
        assert!(repo.create(&ctx, &input).await.unwrap_err().is_not_found());
    }
}
