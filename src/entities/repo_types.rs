use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Social channels tracked for a client. Empty strings read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub facebook: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub linkedin: Option<String>,
}

/// Per-channel update; `Some("")` clears a channel, `None` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocialMediaPatch {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub linkedin: Option<String>,
}

impl SocialMedia {
    /// Same value with blank channels read as absent, as they are on load.
    pub fn normalized(self) -> Self {
        Self {
            instagram: self.instagram.and_then(non_empty),
            facebook: self.facebook.and_then(non_empty),
            linkedin: self.linkedin.and_then(non_empty),
        }
    }

    pub fn merge(&mut self, patch: SocialMediaPatch) {
        fn set(slot: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value {
                *slot = non_empty(v);
            }
        }
        set(&mut self.instagram, patch.instagram);
        set(&mut self.facebook, patch.facebook);
        set(&mut self.linkedin, patch.linkedin);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub notes: String,
    /// May point at a salesperson that no longer exists.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub salesman_id: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub social_media: SocialMedia,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub salesman_id: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub social_media: SocialMedia,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    /// Absent: keep. `null` or `""`: unassign. Value: reassign.
    #[serde(default, deserialize_with = "present_option")]
    pub salesman_id: Option<Option<String>>,
    pub website: Option<String>,
    pub social_media: Option<SocialMediaPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salesperson {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalespersonDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalespersonPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub(crate) fn non_empty(v: String) -> Option<String> {
    if v.trim().is_empty() {
        None
    } else {
        Some(v)
    }
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.and_then(non_empty))
}

fn present_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(de)?.and_then(non_empty)))
}

pub(crate) fn seed_salesmen() -> Vec<Salesperson> {
    [
        ("s1", "John Doe", "john@levantevents.com", "555-0101"),
        ("s2", "Sarah Smith", "sarah@levantevents.com", "555-0102"),
        ("s3", "Mike Johnson", "mike@levantevents.com", "555-0103"),
    ]
    .into_iter()
    .map(|(id, name, email, phone)| Salesperson {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        phone: phone.into(),
    })
    .collect()
}

pub(crate) fn seed_clients(now: OffsetDateTime) -> Vec<Client> {
    vec![
        Client {
            id: "c1".into(),
            full_name: "Alice Thompson".into(),
            phone: "555-1234".into(),
            email: "alice@example.com".into(),
            notes: "Interested in a summer wedding package.".into(),
            salesman_id: Some("s1".into()),
            website: String::new(),
            social_media: SocialMedia::default(),
            updated_at: now,
        },
        Client {
            id: "c2".into(),
            full_name: "Bob Brown".into(),
            phone: "555-5678".into(),
            email: "bob@techcorp.com".into(),
            notes: "Corporate event for Tech Corp.".into(),
            salesman_id: Some("s2".into()),
            website: "techcorp.com".into(),
            social_media: SocialMedia::default(),
            updated_at: now,
        },
    ]
}
