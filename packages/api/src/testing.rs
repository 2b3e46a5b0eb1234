//! Fixtures shared by the unit tests of this crate.

use chrono::NaiveDate;
use store::MemoryStore;

use crate::members::add_member;
use crate::models::{Member, NewMember};

pub const CHAIR: &str = "chair@nkhonde.mw";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A store holding one club with the given `(member_id, first, last)` members.
pub async fn club(members: &[(&str, &str, &str)]) -> (MemoryStore, Vec<Member>) {
    let store = MemoryStore::new();
    let mut added = Vec::new();
    for (id, first, last) in members {
        let member = add_member(
            &store,
            CHAIR,
            NewMember {
                member_id: id.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                phone_number: "0888123456".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        added.push(member);
    }
    (store, added)
}
