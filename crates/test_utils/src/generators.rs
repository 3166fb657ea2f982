//! Property-Based Test Generators
//!
//! Proptest strategies for generating random test data that keeps the
//! domain invariants.

use proptest::prelude::*;

use core_kernel::{ListOptions, SortOrder, MAX_PER_PAGE};
use domain_contacts::PersonInput;
use domain_mail::{MailAddress, OutgoingMessage};

/// Strategy for lowercase, syntactically valid email addresses
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{0,11}", "[a-z]{2,10}", prop_oneof![Just("org"), Just("com"), Just("net")])
        .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
}

/// Strategy for mail addresses with an optional display name
pub fn mail_address_strategy() -> impl Strategy<Value = MailAddress> {
    (email_strategy(), proptest::option::of("[A-Z][a-z]{1,10}( [A-Z][a-z]{1,10})?"))
        .prop_map(|(address, name)| MailAddress::new(&address, name.as_deref()).unwrap())
}

/// Strategy for person names
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,14}"
}

/// Strategy for valid person input
pub fn person_input_strategy() -> impl Strategy<Value = PersonInput> {
    (
        name_strategy(),
        name_strategy(),
        proptest::option::of(email_strategy()),
        any::<bool>(),
    )
        .prop_map(|(first_name, last_name, email, do_not_contact)| PersonInput {
            first_name,
            last_name,
            email,
            do_not_contact,
            ..Default::default()
        })
}

/// Strategy for sort orders
pub fn sort_order_strategy() -> impl Strategy<Value = SortOrder> {
    prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)]
}

/// Strategy for list options within the accepted ranges
pub fn list_options_strategy() -> impl Strategy<Value = ListOptions> {
    (1u32..500, 1u32..=MAX_PER_PAGE, sort_order_strategy())
        .prop_map(|(page, per_page, order)| ListOptions::new(page, per_page).sorted_by("created_at", order))
}

/// Strategy for valid outgoing messages with 1..=5 recipients
pub fn outgoing_message_strategy() -> impl Strategy<Value = OutgoingMessage> {
    (
        mail_address_strategy(),
        proptest::collection::vec(mail_address_strategy(), 1..=5),
        "[A-Za-z0-9 ]{0,60}",
        "[A-Za-z0-9 .,!?]{1,200}",
    )
        .prop_map(|(from, to, subject, body)| OutgoingMessage {
            from,
            to,
            cc: Vec::new(),
            bcc: Vec::new(),
            subject,
            body_text: Some(format!("x{}", body)),
            body_html: None,
            in_reply_to: None,
            message_id: None,
        })
}
