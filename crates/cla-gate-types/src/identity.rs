use serde::{Deserialize, Serialize};

/// A merge-request participant as reported by the hosting platform.
///
/// Ephemeral; never persisted by the gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Numeric user ID on the hosting platform (0 when unknown)
    #[serde(rename = "id")]
    pub external_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Participant {
    /// Non-empty email, if the platform exposed one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// Non-empty username.
    pub fn username(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|u| !u.is_empty())
    }
}

/// User record owned by the user-management subsystem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalUser {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub lf_email: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl InternalUser {
    /// Profile emails followed by the LF email, without empties.
    pub fn all_emails(&self) -> Vec<&str> {
        self.emails
            .iter()
            .map(String::as_str)
            .chain(self.lf_email.as_deref())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Company affiliation, when one is recorded.
    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub company_name: String,
}
