use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Resource, error::Result};

pub const GENRE_PATH: &str = "/catalog/genre";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl Resource for Genre {
    fn url(&self) -> String {
        format!("{GENRE_PATH}/{}", self.id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateGenre {
    pub name: String,
}

pub type GenreRepository = GenreRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: &CreateGenre) -> Result<i64> {
        let result = sqlx::query("INSERT INTO genre (name) VALUES (?)")
            .bind(&payload.name)
            .execute(&self.executor)
            .await?;

        let id = result.last_insert_rowid();
        debug!("Created genre {id}");
        Ok(id)
    }

    pub async fn update(&self, id: i64, payload: &CreateGenre) -> Result<()> {
        let result = sqlx::query("UPDATE genre SET name = ? WHERE id = ?")
            .bind(&payload.name)
            .bind(id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Genre".to_string()))
        } else {
            Ok(())
        }
    }

    /// All genres ordered by name.
    pub async fn list(&self) -> Result<Vec<Genre>> {
        let records = sqlx::query_as::<_, Genre>("SELECT id, name FROM genre ORDER BY name, id")
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    /// Genres associated with a book, ordered by name.
    pub async fn list_by_book(&self, book_id: i64) -> Result<Vec<Genre>> {
        let records = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name FROM genre g JOIN book_genre bg ON bg.genre_id = g.id WHERE bg.book_id = ? ORDER BY g.name, g.id",
        )
        .bind(book_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(records)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Genre>> {
        let record = sqlx::query_as::<_, Genre>("SELECT id, name FROM genre WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(record)
    }

    /// Those of the given ids which belong to a stored genre.
    pub async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id FROM genre WHERE id IN ({placeholders}) ORDER BY id");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let found = query.fetch_all(&self.executor).await?;
        Ok(found)
    }

    /// First genre with exactly this name, if any.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let record = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genre WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.executor)
        .await?;
        Ok(record)
    }


    record_ops!("genre", "Genre");
}
