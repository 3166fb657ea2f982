//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the relevant fields; names and addresses default to
//! random fake values so rows created against a shared database never clash.

use fake::faker::address::en::{CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use core_kernel::HouseholdId;
use domain_contacts::{HouseholdInput, PersonInput};
use domain_identity::SignUp;
use domain_mail::{IncomingEmail, MailAddress, OutgoingMessage};
use uuid::Uuid;

use crate::fixtures::{MailFixtures, StringFixtures};

/// A random, always-valid email address
pub fn fake_email() -> String {
    let local: String = SafeEmail().fake();
    // SafeEmail only draws from a few example domains; prefix for uniqueness
    format!("{}.{}", &Uuid::new_v4().simple().to_string()[..8], local.to_lowercase())
}

/// Builder for person input
pub struct TestPersonBuilder {
    input: PersonInput,
}

impl Default for TestPersonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPersonBuilder {
    /// Creates a builder with a random name and email
    pub fn new() -> Self {
        Self {
            input: PersonInput {
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
                email: Some(fake_email()),
                ..Default::default()
            },
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.input.first_name = first_name.to_string();
        self.input.last_name = last_name.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.input.email = Some(email.to_string());
        self
    }

    pub fn without_email(mut self) -> Self {
        self.input.email = None;
        self
    }

    pub fn in_household(mut self, household_id: HouseholdId) -> Self {
        self.input.household_id = Some(household_id);
        self
    }

    pub fn with_party(mut self, party: &str) -> Self {
        self.input.party_affiliation = Some(party.to_string());
        self
    }

    pub fn do_not_contact(mut self) -> Self {
        self.input.do_not_contact = true;
        self
    }

    /// Builds the normalized input
    pub fn build(self) -> PersonInput {
        self.input.normalized()
    }
}

/// Builder for household input
pub struct TestHouseholdBuilder {
    input: HouseholdInput,
}

impl Default for TestHouseholdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHouseholdBuilder {
    pub fn new() -> Self {
        let last_name: String = LastName().fake();
        let street: String = StreetName().fake();
        Self {
            input: HouseholdInput {
                name: format!("The {} Household", last_name),
                address_line1: Some(format!("{} {}", (1u16..999).fake::<u16>(), street)),
                city: Some(CityName().fake()),
                region: Some(StateAbbr().fake()),
                postal_code: Some(ZipCode().fake()),
                country: Some("US".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.input.name = name.to_string();
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.input.city = Some(city.to_string());
        self
    }

    pub fn build(self) -> HouseholdInput {
        self.input.normalized()
    }
}

/// Builder for organization sign-ups
pub struct TestSignUpBuilder {
    sign_up: SignUp,
}

impl Default for TestSignUpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSignUpBuilder {
    /// Creates a sign-up for a uniquely named organization
    pub fn new() -> Self {
        Self {
            sign_up: SignUp {
                organization_name: format!(
                    "{} {}",
                    StringFixtures::organization_name(),
                    &Uuid::new_v4().simple().to_string()[..8]
                ),
                email: fake_email(),
                password: StringFixtures::password().to_string(),
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
            },
        }
    }

    pub fn with_organization(mut self, name: &str) -> Self {
        self.sign_up.organization_name = name.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.sign_up.email = email.to_string();
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.sign_up.password = password.to_string();
        self
    }

    pub fn build(self) -> SignUp {
        self.sign_up
    }
}

/// Builder for inbound emails
pub struct TestIncomingEmailBuilder {
    email: IncomingEmail,
}

impl Default for TestIncomingEmailBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestIncomingEmailBuilder {
    /// Starts from [`MailFixtures::incoming`] with a fresh Message-ID
    pub fn new() -> Self {
        let mut email = MailFixtures::incoming();
        email.message_id = Some(format!("<{}@example.com>", Uuid::new_v4()));
        Self { email }
    }

    pub fn from(mut self, address: &str) -> Self {
        self.email.from = MailAddress::new(address, None).unwrap();
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.email.subject = subject.to_string();
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.email.body_text = Some(body.to_string());
        self
    }

    pub fn without_attachments(mut self) -> Self {
        self.email.attachments.clear();
        self
    }

    pub fn build(self) -> IncomingEmail {
        self.email
    }
}

/// Builder for outbound messages
pub struct TestOutgoingMessageBuilder {
    message: OutgoingMessage,
}

impl Default for TestOutgoingMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOutgoingMessageBuilder {
    pub fn new() -> Self {
        Self {
            message: MailFixtures::outgoing(),
        }
    }

    pub fn to(mut self, address: &str) -> Self {
        self.message.to = vec![MailAddress::new(address, None).unwrap()];
        self
    }

    pub fn cc(mut self, address: &str) -> Self {
        self.message.cc.push(MailAddress::new(address, None).unwrap());
        self
    }

    pub fn bcc(mut self, address: &str) -> Self {
        self.message.bcc.push(MailAddress::new(address, None).unwrap());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.message.subject = subject.to_string();
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.message.body_html = Some(html.to_string());
        self
    }

    pub fn build(self) -> OutgoingMessage {
        self.message
    }
}
