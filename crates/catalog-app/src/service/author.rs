use catalog_dal::{
    author::{Author, AuthorRepository, AUTHOR_PATH},
    book::{BookRepository, BookShort},
    dates, Pool, Resource as _,
};
use serde::Serialize;
use time::Date;
use tracing::debug;

use super::{deleted, linked, not_found, Deletion, FormPage, Linked, Rejected, Saved, Submission};
use crate::{
    error::{Error, Result},
    form::{process, AuthorForm},
};

/// Author with its derived, display only fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
    pub name: String,
    pub lifespan: String,
    pub birth_formatted: String,
    pub death_formatted: String,
    pub url: String,
}

impl From<Author> for AuthorView {
    fn from(author: Author) -> Self {
        AuthorView {
            name: author.name(),
            lifespan: author.lifespan(),
            birth_formatted: author.birth_formatted(),
            death_formatted: author.death_formatted(),
            url: author.url(),
            id: author.id,
            first_name: author.first_name,
            family_name: author.family_name,
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorDetail {
    pub author: AuthorView,
    pub books: Vec<Linked<BookShort>>,
}

pub type AuthorSubmission = Submission<AuthorForm>;

pub struct AuthorService {
    authors: AuthorRepository,
    books: BookRepository,
}

crate::service_from_request!(AuthorService);

impl AuthorService {
    pub fn new(pool: Pool) -> Self {
        AuthorService {
            authors: AuthorRepository::new(pool.clone()),
            books: BookRepository::new(pool),
        }
    }

    /// All authors ordered by family name.
    pub async fn list(&self) -> Result<Vec<AuthorView>> {
        let authors = self.authors.list().await?;
        Ok(authors.into_iter().map(AuthorView::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<AuthorDetail> {
        let (author, books) =
            futures::try_join!(self.authors.get(id), self.books.list_by_author(id))?;
        let author = author.ok_or(Error::NotFound("Author"))?;
        Ok(AuthorDetail {
            author: author.into(),
            books: linked(books),
        })
    }

    pub async fn prepare_create_form(&self) -> Result<FormPage<AuthorForm>> {
        Ok(FormPage {
            input: AuthorForm::default(),
            context: (),
        })
    }

    pub async fn create(&self, form: AuthorForm) -> Result<AuthorSubmission> {
        let payload = match process(form) {
            Ok(payload) => payload,
            Err(invalid) => return Ok(Submission::Rejected(Rejected::from_invalid(invalid))),
        };
        let id = self.authors.create(&payload).await?;
        Ok(Submission::Saved(Saved::new(id, author_url(id))))
    }

    pub async fn prepare_update_form(&self, id: i64) -> Result<FormPage<AuthorForm>> {
        let author = self
            .authors
            .get(id)
            .await?
            .ok_or(Error::NotFound("Author"))?;
        let iso = |d: Option<Date>| d.as_ref().map(dates::format_iso).unwrap_or_default();
        Ok(FormPage {
            input: AuthorForm {
                first_name: author.first_name,
                family_name: author.family_name,
                date_of_birth: iso(author.date_of_birth),
                date_of_death: iso(author.date_of_death),
            },
            context: (),
        })
    }

    pub async fn update(&self, id: i64, form: AuthorForm) -> Result<AuthorSubmission> {
        let payload = match process(form) {
            Ok(payload) => payload,
            Err(invalid) => return Ok(Submission::Rejected(Rejected::from_invalid(invalid))),
        };
        self.authors
            .update(id, &payload)
            .await
            .map_err(not_found("Author"))?;
        Ok(Submission::Saved(Saved::new(id, author_url(id))))
    }

    /// Author and the books which would prevent its deletion,
    /// `None` when the author does not exist.
    pub async fn prepare_delete(&self, id: i64) -> Result<Option<AuthorDetail>> {
        match self.get(id).await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<Deletion<AuthorDetail>> {
        let (author, books) =
            futures::try_join!(self.authors.get(id), self.books.list_by_author(id))?;
        let Some(author) = author else {
            return Ok(Deletion::Missing);
        };
        if !books.is_empty() {
            debug!("Author {id} still has {} books", books.len());
            return Ok(Deletion::Blocked(AuthorDetail {
                author: author.into(),
                books: linked(books),
            }));
        }
        deleted(self.authors.delete(id).await)
    }
}

fn author_url(id: i64) -> String {
    format!("{AUTHOR_PATH}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_view_derived_fields() {
        let view = AuthorView::from(Author {
            id: 7,
            first_name: "Jane".to_string(),
            family_name: "Austen".to_string(),
            date_of_birth: Some(date!(1775 - 12 - 16)),
            date_of_death: Some(date!(1817 - 07 - 18)),
        });
        assert_eq!(view.name, "Austen, Jane");
        assert_eq!(view.lifespan, "1775 - 1817");
        assert_eq!(view.birth_formatted, "Dec 16, 1775");
        assert_eq!(view.death_formatted, "Jul 18, 1817");
        assert_eq!(view.url, "/catalog/author/7");
    }

    #[test]
    fn test_view_without_dates() {
        let view = AuthorView::from(Author {
            id: 1,
            first_name: "Homer".to_string(),
            family_name: String::new(),
            date_of_birth: None,
            date_of_death: None,
        });
        assert_eq!(view.name, "");
        assert_eq!(view.lifespan, "NO BIRTH AND DEATH DATA");
        assert_eq!(view.birth_formatted, "");
    }
}
