use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, Row as _, SqliteConnection};
use tracing::debug;

use crate::{ChosenRow, Error, FromRowPrefixed, Resource, author::Author, error::Result};

pub const BOOK_PATH: &str = "/catalog/book";

pub fn book_url(id: i64) -> String {
    format!("{BOOK_PATH}/{id}")
}

/// Stored book document, with its genre references.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub summary: String,
    pub isbn: String,
    #[sqlx(skip)]
    pub genre_ids: Vec<i64>,
}

impl Resource for Book {
    fn url(&self) -> String {
        book_url(self.id)
    }
}

/// Title and summary, as shown among dependents of an author or a genre.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookShort {
    pub id: i64,
    pub title: String,
    pub summary: String,
}

impl Resource for BookShort {
    fn url(&self) -> String {
        book_url(self.id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookTitle {
    pub id: i64,
    pub title: String,
}

impl Resource for BookTitle {
    fn url(&self) -> String {
        book_url(self.id)
    }
}

impl FromRowPrefixed for BookTitle {
    fn from_row_prefixed(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(BookTitle {
            id: row.try_get("book_id")?,
            title: row.try_get("book_title")?,
        })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BookListing {
    pub id: i64,
    pub title: String,
    pub author: Author,
}

impl Resource for BookListing {
    fn url(&self) -> String {
        book_url(self.id)
    }
}

impl sqlx::FromRow<'_, ChosenRow> for BookListing {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(BookListing {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: Author::from_row_prefixed(row)?,
        })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BookWithAuthor {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: Author,
}

impl Resource for BookWithAuthor {
    fn url(&self) -> String {
        book_url(self.id)
    }
}

impl sqlx::FromRow<'_, ChosenRow> for BookWithAuthor {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(BookWithAuthor {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            isbn: row.try_get("isbn")?,
            author: Author::from_row_prefixed(row)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateBook {
    pub title: String,
    pub author_id: i64,
    pub summary: String,
    pub isbn: String,
    pub genre_ids: Vec<i64>,
}

const AUTHOR_COLUMNS: &str = "a.id AS author_id, a.first_name AS author_first_name, a.family_name AS author_family_name, \
a.date_of_birth AS author_date_of_birth, a.date_of_death AS author_date_of_death";

async fn replace_genres(
    book_id: i64,
    genre_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<()> {
    sqlx::query("DELETE FROM book_genre WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;
    for genre_id in genre_ids {
        sqlx::query("INSERT OR IGNORE INTO book_genre (book_id, genre_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub type BookRepository = BookRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>
        + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: &CreateBook) -> Result<i64> {
        let mut tx = self.executor.begin().await?;
        let result =
            sqlx::query("INSERT INTO book (title, author_id, summary, isbn) VALUES (?, ?, ?, ?)")
                .bind(&payload.title)
                .bind(payload.author_id)
                .bind(&payload.summary)
                .bind(&payload.isbn)
                .execute(&mut *tx)
                .await?;
        let id = result.last_insert_rowid();
        replace_genres(id, &payload.genre_ids, &mut *tx).await?;
        tx.commit().await?;

        debug!("Created book {id} with {} genres", payload.genre_ids.len());
        Ok(id)
    }

    /// Overwrites all fields and the genre set of an existing book.
    pub async fn update(&self, id: i64, payload: &CreateBook) -> Result<()> {
        let mut tx = self.executor.begin().await?;
        let result = sqlx::query(
            "UPDATE book SET title = ?, author_id = ?, summary = ?, isbn = ? WHERE id = ?",
        )
        .bind(&payload.title)
        .bind(payload.author_id)
        .bind(&payload.summary)
        .bind(&payload.isbn)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Book".to_string()));
        }
        replace_genres(id, &payload.genre_ids, &mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Book>> {
        let record =
            sqlx::query_as::<_, Book>("SELECT id, title, author_id, summary, isbn FROM book WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?;
        match record {
            None => Ok(None),
            Some(mut book) => {
                book.genre_ids = sqlx::query_scalar(
                    "SELECT genre_id FROM book_genre WHERE book_id = ? ORDER BY genre_id",
                )
                .bind(id)
                .fetch_all(&self.executor)
                .await?;
                Ok(Some(book))
            }
        }
    }

    pub async fn get_with_author(&self, id: i64) -> Result<Option<BookWithAuthor>> {
        let sql = format!(
            "SELECT b.id, b.title, b.summary, b.isbn, {AUTHOR_COLUMNS} FROM book b JOIN author a ON a.id = b.author_id WHERE b.id = ?"
        );
        let record = sqlx::query_as::<_, BookWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(record)
    }

    /// All books ordered by title, with their authors.
    pub async fn list(&self) -> Result<Vec<BookListing>> {
        let sql = format!(
            "SELECT b.id, b.title, {AUTHOR_COLUMNS} FROM book b JOIN author a ON a.id = b.author_id ORDER BY b.title, b.id"
        );
        let records = sqlx::query_as::<_, BookListing>(&sql)
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    pub async fn list_titles(&self) -> Result<Vec<BookTitle>> {
        let records = sqlx::query_as::<_, BookTitle>("SELECT id, title FROM book ORDER BY title, id")
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<BookShort>> {
        let records = sqlx::query_as::<_, BookShort>(
            "SELECT id, title, summary FROM book WHERE author_id = ? ORDER BY title, id",
        )
        .bind(author_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(records)
    }

    pub async fn list_by_genre(&self, genre_id: i64) -> Result<Vec<BookShort>> {
        let records = sqlx::query_as::<_, BookShort>(
            "SELECT b.id, b.title, b.summary FROM book b JOIN book_genre bg ON bg.book_id = b.id WHERE bg.genre_id = ? ORDER BY b.title, b.id",
        )
        .bind(genre_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(records)
    }


    record_ops!("book", "Book");
}
