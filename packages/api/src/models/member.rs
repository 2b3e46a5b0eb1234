use serde::{Deserialize, Serialize};

/// A club member. Stored in `clubMembers` under its `memberId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: String,
    pub chair_email: String,
}

impl Member {
    /// "First Last", as shown on contribution and loan cards.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input of the add-member form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewMember {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    /// Raw bytes of an optional member photo.
    pub photo: Option<Vec<u8>>,
}
