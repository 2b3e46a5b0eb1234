//! Member roster: add, list, look up and search club members.

use store::collections::CLUB_MEMBERS;
use store::{to_fields, Batch, BlobStore, Direction, DocumentStore, Precondition, Query};

use crate::error::{ApiError, ApiResult};
use crate::models::{Member, NewMember};

/// Blob prefix member photos are filed under.
pub const MEMBER_IMAGES: &str = "memberImages";

fn roster_query(chair_email: &str) -> Query {
    Query::new()
        .where_eq("chairEmail", chair_email)
        .order_by("firstName", Direction::Ascending)
        .order_by("lastName", Direction::Ascending)
}

/// Register a member for `chair_email`, uploading the optional photo first.
pub async fn add_member<S: DocumentStore + BlobStore>(
    store: &S,
    chair_email: &str,
    new: NewMember,
) -> ApiResult<Member> {
    let member_id = new.member_id.trim().to_string();
    let first_name = new.first_name.trim().to_string();
    let last_name = new.last_name.trim().to_string();
    let phone_number = new.phone_number.trim().to_string();
    let email = new.email.trim().to_string();

    if [&member_id, &first_name, &last_name, &phone_number]
        .iter()
        .any(|f| f.is_empty())
    {
        return Err(ApiError::validation("Fill all required fields!"));
    }
    if !email.is_empty() && !email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }

    if store.get(CLUB_MEMBERS, &member_id).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "member id {member_id} is already taken"
        )));
    }

    let image_url = match new.photo {
        Some(bytes) if !bytes.is_empty() => store.put_blob(MEMBER_IMAGES, bytes).await?.url,
        _ => String::new(),
    };

    let member = Member {
        member_id,
        first_name,
        last_name,
        phone_number,
        email,
        image_url,
        chair_email: chair_email.to_string(),
    };

    let batch = Batch::new().set_if(
        CLUB_MEMBERS,
        &member.member_id,
        to_fields(&member)?,
        Precondition::Missing,
    );
    if let Err(e) = store.commit(batch).await {
        return Err(if e.is_conflict() {
            ApiError::Conflict(format!("member id {} is already taken", member.member_id))
        } else {
            e.into()
        });
    }

    tracing::info!(member_id = %member.member_id, chair = %chair_email, "member added");
    Ok(member)
}

/// All members of the club, ordered by first then last name.
pub async fn list_members<S: DocumentStore>(store: &S, chair_email: &str) -> ApiResult<Vec<Member>> {
    store
        .query(CLUB_MEMBERS, &roster_query(chair_email))
        .await?
        .iter()
        .map(|doc| doc.decode().map_err(ApiError::from))
        .collect()
}

/// One member of the club. Members of other clubs are reported as not found.
pub async fn get_member<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    member_id: &str,
) -> ApiResult<Member> {
    let not_found = || ApiError::not_found("member", member_id);
    let doc = store
        .get(CLUB_MEMBERS, member_id.trim())
        .await?
        .ok_or_else(not_found)?;
    let member: Member = doc.decode()?;
    if member.chair_email != chair_email {
        return Err(not_found());
    }
    Ok(member)
}

/// Case-insensitive match on first name, last name or member id.
pub fn search_members<'a>(members: &'a [Member], text: &str) -> Vec<&'a Member> {
    let needle = text.trim().to_lowercase();
    members
        .iter()
        .filter(|m| {
            needle.is_empty()
                || m.first_name.to_lowercase().contains(&needle)
                || m.last_name.to_lowercase().contains(&needle)
                || m.member_id.to_lowercase().contains(&needle)
        })
        .collect()
}
