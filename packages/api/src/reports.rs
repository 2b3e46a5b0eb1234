//! Dashboard figures and reports, computed from the club's records.
//!
//! Everything here except [`build_dashboard`] is a pure function over already
//! loaded contributions, loans and members.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use store::DocumentStore;

use crate::contributions::{list_contributions, total_contributions};
use crate::error::ApiResult;
use crate::loans::list_loans;
use crate::members::list_members;
use crate::models::{Contribution, Loan, LoanStatus, Member};

/// The club's savings: every contribution entry, loan debits included.
pub fn total_savings(contributions: &[Contribution]) -> i64 {
    total_contributions(contributions)
}

/// Percentage change the most recent entry made to the total, truncated.
/// Zero with fewer than two entries or when the earlier total is zero.
pub fn growth_percent(contributions: &[Contribution]) -> i64 {
    if contributions.len() < 2 {
        return 0;
    }
    let Some(last) = contributions
        .iter()
        .max_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
    else {
        return 0;
    };
    // Summed in i128; the percentage saturates to i64.
    let total: i128 = contributions.iter().map(|c| i128::from(c.amount)).sum();
    let previous = total - i128::from(last.amount);
    if previous == 0 {
        return 0;
    }
    let percent = i128::from(last.amount) * 100 / previous;
    i64::try_from(percent).unwrap_or(if percent < 0 { i64::MIN } else { i64::MAX })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub description: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
}

/// Contributions as credits and loans as debits, newest date first. A negative
/// entry is a balance the ledger opened for a member with no deposits; it shows
/// as a debit adjustment rather than a contribution.
pub fn recent_activity(contributions: &[Contribution], loans: &[Loan]) -> Vec<Transaction> {
    let mut list: Vec<Transaction> = contributions
        .iter()
        .map(|c| {
            if c.amount < 0 {
                Transaction {
                    description: format!("Balance adjustment - {}", c.member_name),
                    amount: c.amount.saturating_neg(),
                    date: c.date,
                    kind: TransactionKind::Debit,
                }
            } else {
                Transaction {
                    description: format!("Contribution - {}", c.member_name),
                    amount: c.amount,
                    date: c.date,
                    kind: TransactionKind::Credit,
                }
            }
        })
        .collect();
    list.extend(loans.iter().map(|l| Transaction {
        description: match l.status {
            LoanStatus::Approved => format!("Loan disbursed - {}", l.member_name),
            LoanStatus::Pending => format!("Loan - {}", l.member_name),
        },
        amount: l.amount,
        date: l.date,
        kind: TransactionKind::Debit,
    }));
    list.sort_by(|a, b| b.date.cmp(&a.date));
    list
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoanSummary {
    pub pending_count: usize,
    pub pending_total: i64,
    pub approved_count: usize,
    pub approved_total: i64,
}

impl LoanSummary {
    /// Principal currently lent out.
    pub fn outstanding(&self) -> i64 {
        self.approved_total
    }
}

pub fn loan_summary(loans: &[Loan]) -> LoanSummary {
    let mut summary = LoanSummary::default();
    for loan in loans {
        match loan.status {
            LoanStatus::Pending => {
                summary.pending_count += 1;
                summary.pending_total = summary.pending_total.saturating_add(loan.amount);
            }
            LoanStatus::Approved => {
                summary.approved_count += 1;
                summary.approved_total = summary.approved_total.saturating_add(loan.amount);
            }
        }
    }
    summary
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Period {
    Weekly,
    Monthly,
    Quarterly,
    #[default]
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Weekly,
        Period::Monthly,
        Period::Quarterly,
        Period::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
            Period::Quarterly => "Quarterly",
            Period::Yearly => "Yearly",
        }
    }

    /// First day of the bucket holding `date`, with its label.
    fn bucket(&self, date: NaiveDate) -> (NaiveDate, String) {
        let start = match self {
            Period::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Period::Monthly => date.with_day(1).unwrap_or(date),
            Period::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            Period::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        };
        let label = match self {
            Period::Weekly => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Period::Monthly => start.format("%Y-%m").to_string(),
            Period::Quarterly => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
            Period::Yearly => start.year().to_string(),
        };
        (start, label)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown period: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesPoint {
    pub label: String,
    pub start: NaiveDate,
    pub total: i64,
}

/// Contribution totals per period bucket, oldest first. Empty buckets are
/// omitted.
pub fn contribution_series(contributions: &[Contribution], period: Period) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, SeriesPoint> = BTreeMap::new();
    for c in contributions {
        let (start, label) = period.bucket(c.date);
        let point = buckets.entry(start).or_insert_with(|| SeriesPoint {
            label,
            start,
            total: 0,
        });
        point.total = point.total.saturating_add(c.amount);
    }
    buckets.into_values().collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberStatement {
    pub member_id: String,
    pub name: String,
    /// Balance before loan debits: `balance + debits`.
    pub deposits: i64,
    /// Principal of the member's approved loans, as a positive number.
    pub debits: i64,
    pub balance: i64,
    pub approved_loans: i64,
    pub pending_loans: i64,
}

/// One row per member, in roster order.
///
/// Approving a loan debits the member's earliest entry in place, so the debit
/// cannot be told apart from the entries themselves. Debits are therefore the
/// approved loans and deposits are derived from the balance.
pub fn member_statements(
    members: &[Member],
    contributions: &[Contribution],
    loans: &[Loan],
) -> Vec<MemberStatement> {
    members
        .iter()
        .map(|m| {
            let mut row = MemberStatement {
                member_id: m.member_id.clone(),
                name: m.display_name(),
                deposits: 0,
                debits: 0,
                balance: 0,
                approved_loans: 0,
                pending_loans: 0,
            };
            for c in contributions.iter().filter(|c| c.member_id == m.member_id) {
                row.balance = row.balance.saturating_add(c.amount);
            }
            for l in loans.iter().filter(|l| l.member_id == m.member_id) {
                match l.status {
                    LoanStatus::Approved => {
                        row.approved_loans = row.approved_loans.saturating_add(l.amount)
                    }
                    LoanStatus::Pending => {
                        row.pending_loans = row.pending_loans.saturating_add(l.amount)
                    }
                }
            }
            row.debits = row.approved_loans;
            row.deposits = row.balance.saturating_add(row.debits);
            row
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    pub total_savings: i64,
    pub growth_percent: i64,
    pub member_count: usize,
    pub loans: LoanSummary,
    pub recent: Vec<Transaction>,
}

impl Dashboard {
    /// Growth as shown on the dashboard header, e.g. `+25%`.
    pub fn growth_label(&self) -> String {
        if self.growth_percent >= 0 {
            format!("+{}%", self.growth_percent)
        } else {
            format!("{}%", self.growth_percent)
        }
    }
}

pub async fn build_dashboard<S: DocumentStore>(store: &S, chair_email: &str) -> ApiResult<Dashboard> {
    let members = list_members(store, chair_email).await?;
    let contributions = list_contributions(store, chair_email).await?;
    let loans = list_loans(store, chair_email, None).await?;

    tracing::debug!(
        members = members.len(),
        contributions = contributions.len(),
        loans = loans.len(),
        "building dashboard"
    );
    Ok(Dashboard {
        total_savings: total_savings(&contributions),
        growth_percent: growth_percent(&contributions),
        member_count: members.len(),
        loans: loan_summary(&loans),
        recent: recent_activity(&contributions, &loans),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use store::config::LedgerConfig;

    use crate::contributions::add_contribution;
    use crate::ledger::{approve_loan, LoanDecision};
    use crate::loans::apply_for_loan;
    use crate::models::{NewContribution, NewLoan};
    use crate::testing::{club, date, CHAIR};

    fn entry(id: &str, member: &str, amount: i64, day: NaiveDate, millis: i64) -> Contribution {
        Contribution {
            id: id.into(),
            member_id: member.into(),
            member_name: member.into(),
            amount,
            date: day,
            chair_email: CHAIR.into(),
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    fn loan(member: &str, amount: i64, status: LoanStatus, day: NaiveDate) -> Loan {
        Loan {
            id: format!("{member}-{amount}"),
            member_id: member.into(),
            member_name: member.into(),
            amount,
            date: day,
            status,
            chair_email: CHAIR.into(),
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
        }
    }

    #[test]
    fn test_growth_percent() {
        assert_eq!(growth_percent(&[]), 0);
        assert_eq!(
            growth_percent(&[entry("a", "M1", 4000, date(2025, 1, 1), 1)]),
            0
        );

        // Latest by createdAt is 1000 on top of 4000.
        let list = vec![
            entry("b", "M1", 1000, date(2025, 1, 2), 20),
            entry("a", "M1", 4000, date(2025, 1, 1), 10),
        ];
        assert_eq!(total_savings(&list), 5000);
        assert_eq!(growth_percent(&list), 25);

        let debit = vec![
            entry("a", "M1", 4000, date(2025, 1, 1), 10),
            entry("b", "M1", -3000, date(2025, 1, 2), 20),
        ];
        assert_eq!(growth_percent(&debit), -75);

        let from_zero = vec![
            entry("a", "M1", 0, date(2025, 1, 1), 10),
            entry("b", "M1", 100, date(2025, 1, 2), 20),
        ];
        assert_eq!(growth_percent(&from_zero), 0);
    }

    #[test]
    fn test_recent_activity_descriptions() {
        let contributions = vec![entry("a", "Mary", 5000, date(2025, 10, 1), 1)];
        let loans = vec![
            loan("John", 2000, LoanStatus::Approved, date(2025, 10, 5)),
            loan("Grace", 1000, LoanStatus::Pending, date(2025, 9, 1)),
        ];
        let activity = recent_activity(&contributions, &loans);
        let descriptions: Vec<_> = activity.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Loan disbursed - John", "Contribution - Mary", "Loan - Grace"]
        );
        assert_eq!(activity[0].kind, TransactionKind::Debit);
        assert_eq!(activity[1].kind, TransactionKind::Credit);
    }

    #[test]
    fn test_negative_entry_reads_as_adjustment() {
        let contributions = vec![entry("a", "John", -3000, date(2025, 10, 27), 1)];
        let activity = recent_activity(&contributions, &[]);
        assert_eq!(activity[0].description, "Balance adjustment - John");
        assert_eq!(activity[0].amount, 3000);
        assert_eq!(activity[0].kind, TransactionKind::Debit);
    }

    #[test]
    fn test_sums_saturate() {
        let list = vec![
            entry("a", "M1", i64::MAX, date(2025, 1, 1), 10),
            entry("b", "M1", i64::MAX, date(2025, 1, 2), 20),
        ];
        assert_eq!(total_savings(&list), i64::MAX);
        assert_eq!(growth_percent(&list), 100);
        assert_eq!(contribution_series(&list, Period::Yearly)[0].total, i64::MAX);

        let loans = vec![
            loan("A", i64::MAX, LoanStatus::Approved, date(2025, 1, 1)),
            loan("B", i64::MAX, LoanStatus::Approved, date(2025, 1, 1)),
        ];
        assert_eq!(loan_summary(&loans).outstanding(), i64::MAX);
    }

    #[test]
    fn test_loan_summary() {
        let loans = vec![
            loan("A", 2000, LoanStatus::Approved, date(2025, 1, 1)),
            loan("B", 3000, LoanStatus::Approved, date(2025, 1, 1)),
            loan("C", 500, LoanStatus::Pending, date(2025, 1, 1)),
        ];
        let summary = loan_summary(&loans);
        assert_eq!(summary.approved_count, 2);
        assert_eq!(summary.outstanding(), 5000);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.pending_total, 500);
    }

    #[test]
    fn test_contribution_series() {
        let list = vec![
            // Monday and Sunday of the same ISO week.
            entry("a", "M1", 100, date(2025, 10, 20), 1),
            entry("b", "M1", 200, date(2025, 10, 26), 2),
            entry("c", "M1", 400, date(2025, 11, 3), 3),
            entry("d", "M1", 800, date(2026, 2, 1), 4),
        ];

        let weekly = contribution_series(&list, Period::Weekly);
        assert_eq!(weekly.len(), 3);
        assert_eq!(weekly[0].label, "2025-W43");
        assert_eq!(weekly[0].total, 300);

        let monthly = contribution_series(&list, Period::Monthly);
        let labels: Vec<_> = monthly.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2025-10", "2025-11", "2026-02"]);

        let quarterly = contribution_series(&list, Period::Quarterly);
        assert_eq!(quarterly[0].label, "2025-Q4");
        assert_eq!(quarterly[0].total, 700);
        assert_eq!(quarterly[1].label, "2026-Q1");

        let yearly = contribution_series(&list, Period::Yearly);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[1].total, 800);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("monthly".parse::<Period>().unwrap(), Period::Monthly);
        assert_eq!(" Yearly ".parse::<Period>().unwrap(), Period::Yearly);
        assert!("daily".parse::<Period>().is_err());
    }

    #[tokio::test]
    async fn test_statements_and_dashboard() {
        let (store, _) = club(&[("M1", "Mary", "Chirwa"), ("M2", "John", "Banda")]).await;
        add_contribution(
            &store,
            CHAIR,
            NewContribution {
                member_id: "M1".into(),
                amount: 5000,
                date: date(2025, 10, 26),
            },
        )
        .await
        .unwrap();
        apply_for_loan(
            &store,
            CHAIR,
            NewLoan {
                member_id: "M2".into(),
                amount: 1500,
                date: date(2025, 10, 27),
            },
        )
        .await
        .unwrap();

        let dashboard = build_dashboard(&store, CHAIR).await.unwrap();
        assert_eq!(dashboard.total_savings, 5000);
        assert_eq!(dashboard.member_count, 2);
        assert_eq!(dashboard.loans.pending_count, 1);
        assert_eq!(dashboard.recent.len(), 2);
        assert_eq!(dashboard.growth_label(), "+0%");

        let contributions = list_contributions(&store, CHAIR).await.unwrap();
        let loans = list_loans(&store, CHAIR, None).await.unwrap();
        let members = list_members(&store, CHAIR).await.unwrap();
        let rows = member_statements(&members, &contributions, &loans);
        // Roster order: John before Mary.
        assert_eq!(rows[0].member_id, "M2");
        assert_eq!(rows[0].pending_loans, 1500);
        assert_eq!(rows[0].balance, 0);
        assert_eq!(rows[1].name, "Mary Chirwa");
        assert_eq!(rows[1].deposits, 5000);
        assert_eq!(rows[1].balance, 5000);
    }

    #[tokio::test]
    async fn test_statement_after_approved_loan() {
        let (store, _) = club(&[("M1", "Mary", "Chirwa")]).await;
        add_contribution(
            &store,
            CHAIR,
            NewContribution {
                member_id: "M1".into(),
                amount: 5000,
                date: date(2025, 10, 26),
            },
        )
        .await
        .unwrap();
        let loan = apply_for_loan(
            &store,
            CHAIR,
            NewLoan {
                member_id: "M1".into(),
                amount: 2000,
                date: date(2025, 10, 27),
            },
        )
        .await
        .unwrap();
        approve_loan(&store, &LedgerConfig::default(), &LoanDecision::new(CHAIR, &loan.id))
            .await
            .unwrap();

        let rows = member_statements(
            &list_members(&store, CHAIR).await.unwrap(),
            &list_contributions(&store, CHAIR).await.unwrap(),
            &list_loans(&store, CHAIR, None).await.unwrap(),
        );
        assert_eq!(rows[0].deposits, 5000);
        assert_eq!(rows[0].debits, 2000);
        assert_eq!(rows[0].balance, 3000);
        assert_eq!(rows[0].approved_loans, 2000);
    }
}
