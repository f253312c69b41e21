use async_trait::async_trait;

use super::model::*;
use crate::recommend::Sampler;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: &str) -> DbResult<User>;
    async fn insert_user(&self, user: &User) -> DbResult<()>;
    async fn update_user(&self, user: &User) -> DbResult<()>;
    async fn touch_user_login(&self, id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait AccessTokenRepo: Send + Sync {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken>;
    async fn insert_token(&self, token: &AccessToken) -> DbResult<()>;
    async fn delete_token(&self, token: &str) -> DbResult<()>;
    async fn touch_token(&self, token: &str) -> DbResult<()>;
}

#[async_trait]
pub trait AuthorRepo: Send + Sync {
    async fn list_authors(&self, search: Option<&str>) -> DbResult<Vec<Author>>;
    async fn get_author(&self, id: AuthorId) -> DbResult<Author>;
    async fn create_author(&self, name: &str) -> DbResult<Author>;
    async fn get_or_create_author(&self, name: &str) -> DbResult<Author>;
    async fn update_author(&self, id: AuthorId, name: &str) -> DbResult<Author>;
    async fn delete_author(&self, id: AuthorId) -> DbResult<()>;
}

#[async_trait]
pub trait BookRepo: Send + Sync {
    /// Lists books in catalog order. `search` matches title or author
    /// name, case-insensitively.
    async fn list_books(&self, search: Option<&str>) -> DbResult<Vec<Book>>;
    async fn get_book(&self, id: BookId) -> DbResult<Book>;
    async fn create_book(&self, title: &str, author_name: &str) -> DbResult<Book>;
    async fn update_book(
        &self,
        id: BookId,
        title: Option<&str>,
        author_name: Option<&str>,
    ) -> DbResult<Book>;
    async fn delete_book(&self, id: BookId) -> DbResult<()>;
}

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Favorites of a user, in insertion order.
    async fn favorites_for_user(&self, user_id: &str) -> DbResult<Vec<Favorite>>;
    async fn get_favorite(&self, user_id: &str, id: i64) -> DbResult<Favorite>;
    async fn add_favorite(&self, user_id: &str, book_id: BookId) -> DbResult<Favorite>;
    async fn delete_favorite(&self, user_id: &str, id: i64) -> DbResult<()>;
}

/// Read queries the recommendation engine runs against the catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn all_books_excluding(&self, exclude: &[BookId]) -> DbResult<Vec<Book>>;

    async fn books_by_authors_excluding(
        &self,
        authors: &[AuthorId],
        exclude: &[BookId],
        limit: usize,
    ) -> DbResult<Vec<Book>>;

    async fn random_books_excluding(
        &self,
        exclude: &[BookId],
        count: usize,
        sampler: &dyn Sampler,
    ) -> DbResult<Vec<Book>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let pool = self.all_books_excluding(exclude).await?;
        Ok(sampler.sample(pool, count))
    }
}

pub trait Repository:
    UserRepo + AccessTokenRepo + AuthorRepo + BookRepo + FavoriteRepo + Catalog + Send + Sync
{
}

impl<T> Repository for T where
    T: UserRepo + AccessTokenRepo + AuthorRepo + BookRepo + FavoriteRepo + Catalog + Send + Sync
{
}
