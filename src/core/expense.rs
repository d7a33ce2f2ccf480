//! Expense business logic - validated creation and aggregate reads.
//!
//! Expenses are never edited or deleted. Every aggregate here is scoped to a
//! single profile and can be narrowed with an [`ExpenseFilter`]. All functions
//! are generic over [`ConnectionTrait`] so they run the same inside or outside
//! a database transaction.

use crate::{
    entities::{Expense, expense},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, QuerySelect, Select, Set, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// Category used when the caller leaves it blank.
pub const DEFAULT_CATEGORY: &str = "General";

/// Largest storable amount (ten digits, two of them decimals).
pub const MAX_AMOUNT: f64 = 99_999_999.99;

const MAX_DESCRIPTION_LEN: usize = 255;
const MAX_CATEGORY_LEN: usize = 50;

/// Categories offered by the front end when logging an expense.
pub const SUGGESTED_CATEGORIES: [&str; 8] = [
    "General",
    "Food",
    "Transport",
    "Shopping",
    "Entertainment",
    "Bills",
    "Health",
    "Other",
];

/// Input for logging a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Amount spent, must be positive
    pub amount: f64,
    /// What the money was spent on
    pub description: String,
    /// Spending category, [`DEFAULT_CATEGORY`] when `None` or blank
    pub category: Option<String>,
    /// Day the expense happened
    pub date: NaiveDate,
}

/// Total spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// Category name
    pub category: String,
    /// Sum of all expenses in the category
    pub total: f64,
}

/// Narrows the expenses an aggregate looks at.
///
/// Date bounds are `from` inclusive and `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// First day included
    pub from: Option<NaiveDate>,
    /// First day no longer included
    pub until: Option<NaiveDate>,
    /// Only these categories, when set
    pub categories: Option<Vec<String>>,
    /// Never these categories
    pub excluded_categories: Vec<String>,
}

impl ExpenseFilter {
    /// Expenses dated on or after `from`.
    #[must_use]
    pub fn since(from: NaiveDate) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    /// Expenses dated in `[from, until)`.
    #[must_use]
    pub fn between(from: NaiveDate, until: NaiveDate) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
            ..Self::default()
        }
    }

    /// Restricts the filter to the given categories.
    #[must_use]
    pub fn only<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        self.categories = Some(categories.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    /// Drops the given categories from the filter.
    #[must_use]
    pub fn excluding<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        self.excluded_categories
            .extend(categories.iter().map(|c| c.as_ref().to_string()));
        self
    }

    fn apply(&self, profile_id: i64, query: Select<Expense>) -> Select<Expense> {
        let mut query = query.filter(expense::Column::ProfileId.eq(profile_id));
        if let Some(from) = self.from {
            query = query.filter(expense::Column::Date.gte(from));
        }
        if let Some(until) = self.until {
            query = query.filter(expense::Column::Date.lt(until));
        }
        if let Some(categories) = &self.categories {
            query = query.filter(expense::Column::Category.is_in(categories.clone()));
        }
        if !self.excluded_categories.is_empty() {
            query = query.filter(
                expense::Column::Category.is_not_in(self.excluded_categories.clone()),
            );
        }
        query
    }
}

/// Checks an expense before anything is written.
///
/// Rejects non-finite, non-positive or oversized amounts, blank or overlong
/// descriptions and overlong categories.
pub fn validate_expense(new_expense: &NewExpense) -> Result<()> {
    let amount = new_expense.amount;
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }

    let description = new_expense.description.trim();
    if description.is_empty() {
        return Err(Error::Validation {
            message: "Expense description cannot be empty".to_string(),
        });
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::Validation {
            message: format!("Expense description exceeds {MAX_DESCRIPTION_LEN} characters"),
        });
    }

    if let Some(category) = &new_expense.category {
        if category.trim().chars().count() > MAX_CATEGORY_LEN {
            return Err(Error::Validation {
                message: format!("Category exceeds {MAX_CATEGORY_LEN} characters"),
            });
        }
    }

    Ok(())
}

/// Validates and stores a new expense for a profile.
#[instrument(skip(db, new_expense), fields(amount = new_expense.amount))]
pub async fn create_expense<C>(
    db: &C,
    profile_id: i64,
    new_expense: NewExpense,
) -> Result<expense::Model>
where
    C: ConnectionTrait,
{
    validate_expense(&new_expense)?;

    let category = new_expense
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    // Store at cent precision
    let amount = (new_expense.amount * 100.0).round() / 100.0;

    let model = expense::ActiveModel {
        profile_id: Set(profile_id),
        amount: Set(amount),
        description: Set(new_expense.description.trim().to_string()),
        category: Set(category),
        date: Set(new_expense.date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    debug!(expense_id = created.id, "Expense stored");
    Ok(created)
}

/// Number of expenses matching the filter.
pub async fn count_expenses<C>(db: &C, profile_id: i64, filter: &ExpenseFilter) -> Result<u64>
where
    C: ConnectionTrait,
{
    filter
        .apply(profile_id, Expense::find())
        .count(db)
        .await
        .map_err(Into::into)
}

/// Sum of the amounts matching the filter, 0 when nothing matches.
pub async fn sum_expenses<C>(db: &C, profile_id: i64, filter: &ExpenseFilter) -> Result<f64>
where
    C: ConnectionTrait,
{
    // An empty inclusion list can never match
    if filter.categories.as_ref().is_some_and(Vec::is_empty) {
        return Ok(0.0);
    }

    let total: Option<Option<f64>> = filter
        .apply(profile_id, Expense::find())
        .select_only()
        .column_as(Expr::col(expense::Column::Amount).sum(), "total")
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(0.0))
}

/// Number of distinct days with at least one expense matching the filter.
pub async fn count_distinct_dates<C>(
    db: &C,
    profile_id: i64,
    filter: &ExpenseFilter,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let dates: Vec<Date> = filter
        .apply(profile_id, Expense::find())
        .select_only()
        .column(expense::Column::Date)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    Ok(dates.len() as u64)
}

/// Categories with the highest total spend, largest first.
///
/// Ties are broken alphabetically so the order is stable.
pub async fn top_categories<C>(db: &C, profile_id: i64, limit: usize) -> Result<Vec<CategoryTotal>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(String, Option<f64>)> = Expense::find()
        .filter(expense::Column::ProfileId.eq(profile_id))
        .select_only()
        .column(expense::Column::Category)
        .column_as(Expr::col(expense::Column::Amount).sum(), "total")
        .group_by(expense::Column::Category)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: Vec<CategoryTotal> = rows
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category,
            total: total.unwrap_or(0.0),
        })
        .collect();
    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    totals.truncate(limit);
    Ok(totals)
}

/// Date of the profile's oldest expense.
pub async fn earliest_expense_date<C>(db: &C, profile_id: i64) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let first = Expense::find()
        .filter(expense::Column::ProfileId.eq(profile_id))
        .order_by_asc(expense::Column::Date)
        .one(db)
        .await?;

    Ok(first.map(|e| e.date))
}

/// Expenses newest first (by date, then by creation time).
pub async fn recent_expenses<C>(
    db: &C,
    profile_id: i64,
    limit: Option<u64>,
) -> Result<Vec<expense::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Expense::find()
        .filter(expense::Column::ProfileId.eq(profile_id))
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::CreatedAt)
        .order_by_desc(expense::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    query.all(db).await.map_err(Into::into)
}
