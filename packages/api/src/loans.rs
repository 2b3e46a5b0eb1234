//! Loan applications and listing. Status changes live in [`crate::ledger`].

use chrono::Utc;
use store::collections::LOANS;
use store::{to_fields, Batch, Direction, DocumentStore, Precondition, Query};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::members::get_member;
use crate::models::{Loan, LoanStatus, NewLoan};

/// Open a pending loan for a member of the club.
pub async fn apply_for_loan<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    new: NewLoan,
) -> ApiResult<Loan> {
    if new.amount <= 0 {
        return Err(ApiError::validation("Loan amount must be positive"));
    }
    let member = get_member(store, chair_email, &new.member_id).await?;

    let loan = Loan {
        id: Uuid::new_v4().to_string(),
        member_name: member.display_name(),
        member_id: member.member_id,
        amount: new.amount,
        date: new.date,
        status: LoanStatus::Pending,
        chair_email: chair_email.to_string(),
        created_at: Utc::now(),
    };
    store
        .commit(Batch::new().set_if(LOANS, &loan.id, to_fields(&loan)?, Precondition::Missing))
        .await?;

    tracing::info!(loan_id = %loan.id, member_id = %loan.member_id, amount = loan.amount, "loan requested");
    Ok(loan)
}

/// Loans of the club, newest first, optionally restricted to one status.
pub async fn list_loans<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    status: Option<LoanStatus>,
) -> ApiResult<Vec<Loan>> {
    let mut query = Query::new().where_eq("chairEmail", chair_email);
    if let Some(status) = status {
        query = query.where_eq("status", status.as_str());
    }
    let query = query
        .order_by("date", Direction::Descending)
        .order_by("createdAt", Direction::Descending);

    store
        .query(LOANS, &query)
        .await?
        .iter()
        .map(|doc| doc.decode().map_err(ApiError::from))
        .collect()
}

/// A loan together with the stored version it was read at.
pub(crate) async fn load_loan<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    loan_id: &str,
) -> ApiResult<(Loan, u64)> {
    let not_found = || ApiError::not_found("loan", loan_id);
    let doc = store.get(LOANS, loan_id).await?.ok_or_else(not_found)?;
    let loan: Loan = doc.decode()?;
    if loan.chair_email != chair_email {
        return Err(not_found());
    }
    Ok((loan, doc.version))
}

pub async fn get_loan<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    loan_id: &str,
) -> ApiResult<Loan> {
    Ok(load_loan(store, chair_email, loan_id).await?.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{club, date, CHAIR};

    #[tokio::test]
    async fn test_apply_starts_pending() {
        let (store, _) = club(&[("M1", "Mary", "Chirwa")]).await;
        let loan = apply_for_loan(
            &store,
            CHAIR,
            NewLoan {
                member_id: "M1".into(),
                amount: 2000,
                date: date(2025, 10, 20),
            },
        )
        .await
        .unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.member_name, "Mary Chirwa");

        let fetched = get_loan(&store, CHAIR, &loan.id).await.unwrap();
        assert_eq!(fetched.id, loan.id);
        assert_eq!(fetched.amount, 2000);
        assert_eq!(fetched.status, LoanStatus::Pending);
        assert!(matches!(
            get_loan(&store, "other@club.mw", &loan.id).await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_validation() {
        let (store, _) = club(&[("M1", "Mary", "Chirwa")]).await;
        let negative = NewLoan {
            member_id: "M1".into(),
            amount: -5,
            date: date(2025, 10, 20),
        };
        assert!(matches!(
            apply_for_loan(&store, CHAIR, negative).await,
            Err(ApiError::Validation(_))
        ));
        let unknown = NewLoan {
            member_id: "nobody".into(),
            amount: 100,
            date: date(2025, 10, 20),
        };
        assert!(matches!(
            apply_for_loan(&store, CHAIR, unknown).await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (store, _) = club(&[("M1", "Mary", "Chirwa"), ("M2", "John", "Banda")]).await;
        for (member, day) in [("M1", 1), ("M2", 3)] {
            apply_for_loan(
                &store,
                CHAIR,
                NewLoan {
                    member_id: member.into(),
                    amount: 1000,
                    date: date(2025, 11, day),
                },
            )
            .await
            .unwrap();
        }

        let all = list_loans(&store, CHAIR, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].member_id, "M2");

        assert_eq!(
            list_loans(&store, CHAIR, Some(LoanStatus::Pending))
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(list_loans(&store, CHAIR, Some(LoanStatus::Approved))
            .await
            .unwrap()
            .is_empty());
    }
}
