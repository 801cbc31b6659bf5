use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Row as _;
use time::Date;
use tracing::debug;

use crate::{ChosenRow, Error, FromRowPrefixed, Resource, book::BookTitle, dates, error::Result};

pub const BOOK_INSTANCE_PATH: &str = "/catalog/bookinstance";

pub fn book_instance_url(id: i64) -> String {
    format!("{BOOK_INSTANCE_PATH}/{id}")
}

#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type,
)]
pub enum InstanceStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 4] = [
        InstanceStatus::Available,
        InstanceStatus::Maintenance,
        InstanceStatus::Loaned,
        InstanceStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Available => "Available",
            InstanceStatus::Maintenance => "Maintenance",
            InstanceStatus::Loaned => "Loaned",
            InstanceStatus::Reserved => "Reserved",
        }
    }
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid status: {0}")]
pub struct InvalidStatus(String);

impl FromStr for InstanceStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstanceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookInstance {
    pub id: i64,
    pub book_id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<Date>,
}

impl Resource for BookInstance {
    fn url(&self) -> String {
        book_instance_url(self.id)
    }
}

impl BookInstance {
    pub fn due_back_formatted(&self) -> String {
        self.due_back
            .as_ref()
            .map(dates::format_medium)
            .unwrap_or_default()
    }
}

/// Book copy with the title of its book resolved.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BookInstanceListing {
    pub id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<Date>,
    pub book: BookTitle,
}

impl Resource for BookInstanceListing {
    fn url(&self) -> String {
        book_instance_url(self.id)
    }
}

impl BookInstanceListing {
    pub fn due_back_formatted(&self) -> String {
        self.due_back
            .as_ref()
            .map(dates::format_medium)
            .unwrap_or_default()
    }
}

impl sqlx::FromRow<'_, ChosenRow> for BookInstanceListing {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(BookInstanceListing {
            id: row.try_get("id")?,
            imprint: row.try_get("imprint")?,
            status: row.try_get("status")?,
            due_back: row.try_get("due_back")?,
            book: BookTitle::from_row_prefixed(row)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateBookInstance {
    pub book_id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<Date>,
}

const LISTING_QUERY: &str = "SELECT i.id, i.imprint, i.status, i.due_back, b.id AS book_id, b.title AS book_title \
FROM book_instance i JOIN book b ON b.id = i.book_id";

pub type BookInstanceRepository = BookInstanceRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct BookInstanceRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookInstanceRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: &CreateBookInstance) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO book_instance (book_id, imprint, status, due_back) VALUES (?, ?, ?, ?)",
        )
        .bind(payload.book_id)
        .bind(&payload.imprint)
        .bind(payload.status)
        .bind(payload.due_back)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created book instance {id}");
        Ok(id)
    }

    pub async fn update(&self, id: i64, payload: &CreateBookInstance) -> Result<()> {
        let result = sqlx::query(
            "UPDATE book_instance SET book_id = ?, imprint = ?, status = ?, due_back = ? WHERE id = ?",
        )
        .bind(payload.book_id)
        .bind(&payload.imprint)
        .bind(payload.status)
        .bind(payload.due_back)
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("BookInstance".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<BookInstance>> {
        let record = sqlx::query_as::<_, BookInstance>(
            "SELECT id, book_id, imprint, status, due_back FROM book_instance WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?;
        Ok(record)
    }

    pub async fn get_with_book(&self, id: i64) -> Result<Option<BookInstanceListing>> {
        let sql = format!("{LISTING_QUERY} WHERE i.id = ?");
        let record = sqlx::query_as::<_, BookInstanceListing>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<BookInstanceListing>> {
        let sql = format!("{LISTING_QUERY} ORDER BY b.title, i.id");
        let records = sqlx::query_as::<_, BookInstanceListing>(&sql)
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    pub async fn list_by_book(&self, book_id: i64) -> Result<Vec<BookInstance>> {
        let records = sqlx::query_as::<_, BookInstance>(
            "SELECT id, book_id, imprint, status, due_back FROM book_instance WHERE book_id = ? ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(records)
    }


    pub async fn count_by_status(&self, status: InstanceStatus) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM book_instance WHERE status = ?")
            .bind(status)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    record_ops!("book_instance", "BookInstance");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("Loaned".parse::<InstanceStatus>().unwrap(), InstanceStatus::Loaned);
        assert!("loaned".parse::<InstanceStatus>().is_err());
        assert_eq!(InstanceStatus::default(), InstanceStatus::Maintenance);
        for status in InstanceStatus::ALL {
            assert_eq!(status.to_string().parse::<InstanceStatus>().unwrap(), status);
        }
    }
}
