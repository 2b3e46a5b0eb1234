//! Club notifications and the derived activity feed.

use chrono::{DateTime, NaiveDate, Utc};
use store::collections::NOTIFICATIONS;
use store::{to_fields, Batch, Direction, DocumentStore, Precondition, Query};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Contribution, Loan, NewNotification, Notification};

/// Post a notification to the club, optionally addressed to one e-mail.
pub async fn send_notification<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    new: NewNotification,
) -> ApiResult<Notification> {
    let title = new.title.trim().to_string();
    let message = new.message.trim().to_string();
    if title.is_empty() || message.is_empty() {
        return Err(ApiError::validation("Title and message are required"));
    }
    let user_email = new
        .user_email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        title,
        message,
        created_at: Utc::now(),
        user_email,
        category: new.category,
        chair_email: chair_email.to_string(),
    };
    store
        .commit(Batch::new().set_if(
            NOTIFICATIONS,
            &notification.id,
            to_fields(&notification)?,
            Precondition::Missing,
        ))
        .await?;

    tracing::info!(id = %notification.id, category = %notification.category, "notification sent");
    Ok(notification)
}

/// Notifications of the club visible to `viewer`, newest first. Targeted
/// notifications are shown only to their addressee; `None` sees only
/// untargeted ones.
pub async fn list_notifications<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    viewer: Option<&str>,
) -> ApiResult<Vec<Notification>> {
    let query = Query::new()
        .where_eq("chairEmail", chair_email)
        .order_by("createdAt", Direction::Descending);
    let viewer = viewer.map(|v| v.trim().to_lowercase());

    let mut visible = Vec::new();
    for doc in store.query(NOTIFICATIONS, &query).await? {
        let notification: Notification = doc.decode()?;
        let shown = match &notification.user_email {
            None => true,
            Some(target) => viewer.as_deref() == Some(target.as_str()),
        };
        if shown {
            visible.push(notification);
        }
    }
    Ok(visible)
}

/// An entry of the activity feed derived from the club's records.
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    pub title: String,
    pub message: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Contributions and loans as feed entries, newest first. Negative entries are
/// loan debits on a member with no deposits and read as balance adjustments.
pub fn activity_feed(contributions: &[Contribution], loans: &[Loan]) -> Vec<Activity> {
    let mut feed: Vec<Activity> = contributions
        .iter()
        .map(|c| {
            let (title, message) = if c.amount < 0 {
                (
                    "Balance Adjustment",
                    format!("{} balance debited MK {}", c.member_name, c.amount.unsigned_abs()),
                )
            } else {
                (
                    "New Contribution",
                    format!("{} contributed MK {}", c.member_name, c.amount),
                )
            };
            Activity {
                title: title.to_string(),
                message,
                date: c.date,
                created_at: c.created_at,
            }
        })
        .chain(loans.iter().map(|l| Activity {
            title: "Loan Update".to_string(),
            message: format!("{} loan status: {}", l.member_name, l.status),
            date: l.date,
            created_at: l.created_at,
        }))
        .collect();
    feed.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoanStatus, NotificationCategory};
    use crate::testing::{date, CHAIR};
    use store::MemoryStore;

    fn note(title: &str, target: Option<&str>) -> NewNotification {
        NewNotification {
            title: title.to_string(),
            message: "Meeting on Saturday".to_string(),
            user_email: target.map(str::to_string),
            category: NotificationCategory::Meeting,
        }
    }

    #[tokio::test]
    async fn test_send_requires_title_and_message() {
        let store = MemoryStore::new();
        let mut blank = note("  ", None);
        assert!(matches!(
            send_notification(&store, CHAIR, blank.clone()).await,
            Err(ApiError::Validation(_))
        ));
        blank.title = "Reminder".to_string();
        blank.message = "\n".to_string();
        assert!(send_notification(&store, CHAIR, blank).await.is_err());
    }

    #[tokio::test]
    async fn test_targeted_visibility() {
        let store = MemoryStore::new();
        send_notification(&store, CHAIR, note("Everyone", None))
            .await
            .unwrap();
        send_notification(&store, CHAIR, note("Only Mary", Some(" Mary@Club.mw ")))
            .await
            .unwrap();
        send_notification(&store, "other@club.mw", note("Elsewhere", None))
            .await
            .unwrap();

        let titles = |list: Vec<Notification>| list.into_iter().map(|n| n.title).collect::<Vec<_>>();

        let anonymous = list_notifications(&store, CHAIR, None).await.unwrap();
        assert_eq!(titles(anonymous), vec!["Everyone"]);

        let mary = list_notifications(&store, CHAIR, Some("mary@club.mw"))
            .await
            .unwrap();
        assert_eq!(mary.len(), 2);
        assert!(titles(mary).contains(&"Only Mary".to_string()));

        let john = list_notifications(&store, CHAIR, Some("john@club.mw"))
            .await
            .unwrap();
        assert_eq!(titles(john), vec!["Everyone"]);
    }

    #[test]
    fn test_activity_feed_newest_first() {
        let now = Utc::now();
        let contributions = vec![Contribution {
            id: "c1".into(),
            member_id: "M1".into(),
            member_name: "Mary Chirwa".into(),
            amount: 5000,
            date: date(2025, 10, 20),
            chair_email: CHAIR.into(),
            created_at: now,
        }];
        let loans = vec![Loan {
            id: "l1".into(),
            member_id: "M2".into(),
            member_name: "John Banda".into(),
            amount: 2000,
            date: date(2025, 10, 27),
            status: LoanStatus::Approved,
            chair_email: CHAIR.into(),
            created_at: now,
        }];

        let feed = activity_feed(&contributions, &loans);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].title, "Loan Update");
        assert_eq!(feed[0].message, "John Banda loan status: Approved");
        assert_eq!(feed[1].message, "Mary Chirwa contributed MK 5000");
    }

    #[test]
    fn test_negative_entry_is_not_a_contribution() {
        let contributions = vec![Contribution {
            id: "c1".into(),
            member_id: "M2".into(),
            member_name: "John Banda".into(),
            amount: -2000,
            date: date(2025, 10, 27),
            chair_email: CHAIR.into(),
            created_at: Utc::now(),
        }];
        let feed = activity_feed(&contributions, &[]);
        assert_eq!(feed[0].title, "Balance Adjustment");
        assert_eq!(feed[0].message, "John Banda balance debited MK 2000");
    }
}
