use serde::{Deserialize, Serialize};
use sqlx::Row as _;
use time::Date;
use tracing::debug;

use crate::{ChosenRow, Error, FromRowPrefixed, Resource, dates, error::Result};

pub const AUTHOR_PATH: &str = "/catalog/author";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
}

impl Author {
    /// `Family, First`, or empty when either part is missing.
    pub fn name(&self) -> String {
        if self.first_name.is_empty() || self.family_name.is_empty() {
            String::new()
        } else {
            format!("{}, {}", self.family_name, self.first_name)
        }
    }

    pub fn lifespan(&self) -> String {
        match self.date_of_birth {
            None => "NO BIRTH AND DEATH DATA".to_string(),
            Some(birth) => {
                let death = self
                    .date_of_death
                    .map(|d| d.year().to_string())
                    .unwrap_or_default();
                format!("{} - {}", birth.year(), death)
            }
        }
    }

    pub fn birth_formatted(&self) -> String {
        self.date_of_birth
            .as_ref()
            .map(dates::format_medium)
            .unwrap_or_default()
    }

    pub fn death_formatted(&self) -> String {
        self.date_of_death
            .as_ref()
            .map(dates::format_medium)
            .unwrap_or_default()
    }
}

impl Resource for Author {
    fn url(&self) -> String {
        format!("{AUTHOR_PATH}/{}", self.id)
    }
}

impl FromRowPrefixed for Author {
    fn from_row_prefixed(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Author {
            id: row.try_get("author_id")?,
            first_name: row.try_get("author_first_name")?,
            family_name: row.try_get("author_family_name")?,
            date_of_birth: row.try_get("author_date_of_birth")?,
            date_of_death: row.try_get("author_date_of_death")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateAuthor {
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
}

pub type AuthorRepository = AuthorRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct AuthorRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> AuthorRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: &CreateAuthor) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO author (first_name, family_name, date_of_birth, date_of_death) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.first_name)
        .bind(&payload.family_name)
        .bind(payload.date_of_birth)
        .bind(payload.date_of_death)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created author {id}");
        Ok(id)
    }

    pub async fn update(&self, id: i64, payload: &CreateAuthor) -> Result<()> {
        let result = sqlx::query(
            "UPDATE author SET first_name = ?, family_name = ?, date_of_birth = ?, date_of_death = ? WHERE id = ?",
        )
        .bind(&payload.first_name)
        .bind(&payload.family_name)
        .bind(payload.date_of_birth)
        .bind(payload.date_of_death)
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Author".to_string()))
        } else {
            Ok(())
        }
    }

    /// All authors ordered by family name.
    pub async fn list(&self) -> Result<Vec<Author>> {
        let records = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, family_name, date_of_birth, date_of_death FROM author ORDER BY family_name, first_name, id",
        )
        .fetch_all(&self.executor)
        .await?;
        Ok(records)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Author>> {
        let record = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, family_name, date_of_birth, date_of_death FROM author WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?;
        Ok(record)
    }


    record_ops!("author", "Author");
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn author(first_name: &str, family_name: &str) -> Author {
        Author {
            id: 7,
            first_name: first_name.to_string(),
            family_name: family_name.to_string(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    #[test]
    fn test_name() {
        assert_eq!(author("Jane", "Austen").name(), "Austen, Jane");
        assert_eq!(author("", "Austen").name(), "");
        assert_eq!(author("Jane", "").name(), "");
    }

    #[test]
    fn test_lifespan() {
        let mut a = author("Jane", "Austen");
        assert_eq!(a.lifespan(), "NO BIRTH AND DEATH DATA");
        a.date_of_death = Some(date!(1817 - 07 - 18));
        assert_eq!(a.lifespan(), "NO BIRTH AND DEATH DATA");
        a.date_of_birth = Some(date!(1775 - 12 - 16));
        assert_eq!(a.lifespan(), "1775 - 1817");
        a.date_of_death = None;
        assert_eq!(a.lifespan(), "1775 - ");
        assert_eq!(a.birth_formatted(), "Dec 16, 1775");
        assert_eq!(a.death_formatted(), "");
    }

    #[test]
    fn test_url() {
        assert_eq!(author("Jane", "Austen").url(), "/catalog/author/7");
    }
}
