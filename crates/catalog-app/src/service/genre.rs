use catalog_dal::{
    book::{BookRepository, BookShort},
    genre::{Genre, GenreRepository, GENRE_PATH},
    Pool,
};
use serde::Serialize;
use tracing::debug;

use super::{deleted, linked, not_found, Deletion, FormPage, Linked, Rejected, Saved, Submission};
use crate::{
    error::{Error, Result},
    form::{process, GenreForm},
};

/// A genre can still be deleted while used by this many books.
const MAX_BOOKS_ON_DELETE: usize = 1;

#[derive(Debug, Clone, Serialize)]
pub struct GenreDetail {
    pub genre: Linked<Genre>,
    pub books: Vec<Linked<BookShort>>,
}

pub type GenreSubmission = Submission<GenreForm>;

pub struct GenreService {
    genres: GenreRepository,
    books: BookRepository,
}

crate::service_from_request!(GenreService);

impl GenreService {
    pub fn new(pool: Pool) -> Self {
        GenreService {
            genres: GenreRepository::new(pool.clone()),
            books: BookRepository::new(pool),
        }
    }

    pub async fn list(&self) -> Result<Vec<Linked<Genre>>> {
        let genres = self.genres.list().await?;
        Ok(linked(genres))
    }

    pub async fn get(&self, id: i64) -> Result<GenreDetail> {
        let (genre, books) =
            futures::try_join!(self.genres.get(id), self.books.list_by_genre(id))?;
        let genre = genre.ok_or(Error::NotFound("Genre"))?;
        Ok(GenreDetail {
            genre: genre.into(),
            books: linked(books),
        })
    }

    pub async fn prepare_create_form(&self) -> Result<FormPage<GenreForm>> {
        Ok(FormPage {
            input: GenreForm::default(),
            context: (),
        })
    }

    /// Creates a genre, unless one with the same name already exists,
    /// in which case the existing one is returned.
    pub async fn create(&self, form: GenreForm) -> Result<GenreSubmission> {
        let payload = match process(form) {
            Ok(payload) => payload,
            Err(invalid) => return Ok(Submission::Rejected(Rejected::from_invalid(invalid))),
        };
        if let Some(existing) = self.genres.find_by_name(&payload.name).await? {
            debug!("Genre {} already exists as {}", payload.name, existing.id);
            return Ok(Submission::Saved(Saved::new(existing.id, genre_url(existing.id))));
        }
        let id = self.genres.create(&payload).await?;
        Ok(Submission::Saved(Saved::new(id, genre_url(id))))
    }

    pub async fn prepare_update_form(&self, id: i64) -> Result<FormPage<GenreForm>> {
        let genre = self.genres.get(id).await?.ok_or(Error::NotFound("Genre"))?;
        Ok(FormPage {
            input: GenreForm { name: genre.name },
            context: (),
        })
    }

    pub async fn update(&self, id: i64, form: GenreForm) -> Result<GenreSubmission> {
        let payload = match process(form) {
            Ok(payload) => payload,
            Err(invalid) => return Ok(Submission::Rejected(Rejected::from_invalid(invalid))),
        };
        self.genres
            .update(id, &payload)
            .await
            .map_err(not_found("Genre"))?;
        Ok(Submission::Saved(Saved::new(id, genre_url(id))))
    }

    pub async fn prepare_delete(&self, id: i64) -> Result<Option<GenreDetail>> {
        match self.get(id).await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deletes the genre and its associations, refused when it is used by
    /// more than one book.
    pub async fn delete(&self, id: i64) -> Result<Deletion<GenreDetail>> {
        let (genre, books) =
            futures::try_join!(self.genres.get(id), self.books.list_by_genre(id))?;
        let Some(genre) = genre else {
            return Ok(Deletion::Missing);
        };
        if books.len() > MAX_BOOKS_ON_DELETE {
            debug!("Genre {id} is used by {} books", books.len());
            return Ok(Deletion::Blocked(GenreDetail {
                genre: genre.into(),
                books: linked(books),
            }));
        }
        deleted(self.genres.delete(id).await)
    }
}

fn genre_url(id: i64) -> String {
    format!("{GENRE_PATH}/{id}")
}
