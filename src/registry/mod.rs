/// Enhetsregisteret (Brønnøysund Register Centre) lookups
///
/// Fetches main entities ("enheter") and subunits ("underenheter") by
/// organization number or name, plus the formatting and relevance helpers
/// used when presenting them.

pub mod address;
pub mod client;
pub mod relevance;

pub use address::format_address;
pub use client::RegistryClient;
pub use relevance::filter_relevant;

use serde::{Deserialize, Serialize};

/// Postal or business address as returned by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street lines
    #[serde(rename = "adresse", default)]
    pub lines: Vec<String>,
    #[serde(rename = "postnummer", default)]
    pub postal_code: Option<String>,
    #[serde(rename = "poststed", default)]
    pub postal_place: Option<String>,
}

/// Organisational form (AS, ENK, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationForm {
    #[serde(rename = "kode")]
    pub code: String,
    #[serde(rename = "beskrivelse", default)]
    pub description: String,
}

/// Main entity ("enhet")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "organisasjonsnummer")]
    pub org_number: String,
    #[serde(rename = "navn", default)]
    pub name: String,
    #[serde(rename = "organisasjonsform", default)]
    pub form: Option<OrganisationForm>,
    #[serde(rename = "forretningsadresse", default)]
    pub business_address: Option<Address>,
    #[serde(rename = "postadresse", default)]
    pub postal_address: Option<Address>,
}

impl Entity {
    /// Business address, falling back to the postal address
    pub fn address(&self) -> Option<&Address> {
        self.business_address
            .as_ref()
            .or(self.postal_address.as_ref())
    }
}

/// Subunit ("underenhet"), e.g. a department or branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subunit {
    #[serde(rename = "organisasjonsnummer")]
    pub org_number: String,
    #[serde(rename = "navn", default)]
    pub name: String,
    #[serde(rename = "beliggenhetsadresse", default)]
    pub location_address: Option<Address>,
    #[serde(rename = "overordnetEnhet", default)]
    pub parent: Option<String>,
}
