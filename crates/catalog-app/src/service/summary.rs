use catalog_dal::{
    author::AuthorRepository, book::BookRepository, book_instance::BookInstanceRepository,
    book_instance::InstanceStatus, genre::GenreRepository, Pool,
};
use serde::Serialize;

use crate::error::Result;

/// Record counts shown on the catalog home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub book_count: u64,
    pub book_instance_count: u64,
    pub book_instance_available_count: u64,
    pub author_count: u64,
    pub genre_count: u64,
}

pub struct SummaryService {
    authors: AuthorRepository,
    books: BookRepository,
    genres: GenreRepository,
    instances: BookInstanceRepository,
}

crate::service_from_request!(SummaryService);

impl SummaryService {
    pub fn new(pool: Pool) -> Self {
        SummaryService {
            authors: AuthorRepository::new(pool.clone()),
            books: BookRepository::new(pool.clone()),
            genres: GenreRepository::new(pool.clone()),
            instances: BookInstanceRepository::new(pool),
        }
    }

    pub async fn summary(&self) -> Result<CatalogSummary> {
        let (book_count, book_instance_count, book_instance_available_count, author_count, genre_count) =
            futures::try_join!(
                self.books.count(),
                self.instances.count(),
                self.instances.count_by_status(InstanceStatus::Available),
                self.authors.count(),
                self.genres.count()
            )?;
        Ok(CatalogSummary {
            book_count,
            book_instance_count,
            book_instance_available_count,
            author_count,
            genre_count,
        })
    }
}
