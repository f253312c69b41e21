use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::model::*;
use super::repo::*;

const BOOK_SELECT: &str = "SELECT b.id, b.title, a.id AS authorid, a.name AS authorname
    FROM books b JOIN authors a ON a.id = b.authorid";

const FAVORITE_SELECT: &str = "SELECT f.id, f.userid, b.id, b.title, a.id, a.name
    FROM favorites f
    JOIN books b ON b.id = f.bookid
    JOIN authors a ON a.id = b.authorid";

type FavoriteTuple = (i64, String, BookId, String, AuthorId, String);

pub struct SqliteRepository {
    pool: SqlitePool,
    token_cache: Arc<RwLock<HashMap<String, AccessToken>>>,
}

impl SqliteRepository {
    pub async fn new(db_path: &str, max_connections: u32) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let repo = Self {
            pool,
            token_cache: Arc::new(RwLock::new(HashMap::new())),
        };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        if let Err(e) = self.flush_token_cache().await {
            error!("Failed to flush token cache: {}", e);
        }
        self.pool.close().await;
    }

    pub fn start_background_tasks(self: Arc<Self>) {
        let repo_clone = Arc::clone(&self);
        tokio::spawn(async move {
            repo_clone.token_flush_loop().await;
        });
    }

    async fn token_flush_loop(&self) {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        loop {
            interval.tick().await;
            if let Err(e) = self.flush_token_cache().await {
                error!("Failed to flush token cache: {}", e);
            }
        }
    }

    /// Persists the `lastused` timestamps collected in the cache.
    async fn flush_token_cache(&self) -> DbResult<()> {
        let cache = self.token_cache.read().await;
        for token in cache.values() {
            if let Some(lastused) = token.lastused {
                sqlx::query("UPDATE accesstokens SET lastused = ? WHERE token = ?")
                    .bind(lastused.to_rfc3339())
                    .bind(&token.token)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

fn not_found(e: sqlx::Error, what: String) -> DbError {
    match e {
        sqlx::Error::RowNotFound => DbError::NotFound(what),
        _ => DbError::Sqlx(e),
    }
}

fn already_exists(e: sqlx::Error, what: String) -> DbError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::AlreadyExists(what),
        _ => DbError::Sqlx(e),
    }
}

/// Builds a `LIKE` pattern matching `search` anywhere, with wildcards escaped.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn favorite_from_tuple(r: FavoriteTuple) -> Favorite {
    Favorite {
        id: r.0,
        userid: r.1,
        book: Book {
            id: r.2,
            title: r.3,
            author: Author { id: r.4, name: r.5 },
        },
    }
}

fn push_not_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    qb.push(" AND ");
    qb.push(column);
    qb.push(" NOT IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created, lastlogin FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("User not found: {}", username)))
    }

    async fn get_user_by_id(&self, id: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created, lastlogin FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("User not found: {}", id)))
    }

    async fn insert_user(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password, created, lastlogin) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.created)
        .bind(&user.lastlogin)
        .execute(&self.pool)
        .await
        .map_err(|e| already_exists(e, format!("User already exists: {}", user.username)))?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET email = ?, password = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", user.id)));
        }
        Ok(())
    }

    async fn touch_user_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET lastlogin = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepo for SqliteRepository {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken> {
        {
            let cache = self.token_cache.read().await;
            if let Some(t) = cache.get(token) {
                return Ok(t.clone());
            }
        }

        let result = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
            "SELECT token, userid, created, lastused FROM accesstokens WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, "Token not found".to_string()))?;

        let access_token = AccessToken {
            token: result.0,
            userid: result.1,
            created: parse_timestamp(result.2),
            lastused: parse_timestamp(result.3),
        };

        let mut cache = self.token_cache.write().await;
        cache.insert(token.to_string(), access_token.clone());

        Ok(access_token)
    }

    async fn insert_token(&self, token: &AccessToken) -> DbResult<()> {
        sqlx::query("INSERT INTO accesstokens (token, userid, created, lastused) VALUES (?, ?, ?, ?)")
            .bind(&token.token)
            .bind(&token.userid)
            .bind(token.created.as_ref().map(|dt| dt.to_rfc3339()))
            .bind(token.lastused.as_ref().map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await?;

        let mut cache = self.token_cache.write().await;
        cache.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, token: &str) -> DbResult<()> {
        {
            let mut cache = self.token_cache.write().await;
            cache.remove(token);
        }

        sqlx::query("DELETE FROM accesstokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_token(&self, token: &str) -> DbResult<()> {
        let mut cache = self.token_cache.write().await;
        if let Some(t) = cache.get_mut(token) {
            t.lastused = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorRepo for SqliteRepository {
    async fn list_authors(&self, search: Option<&str>) -> DbResult<Vec<Author>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM authors WHERE 1=1");
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            qb.push(" AND name LIKE ");
            qb.push_bind(like_pattern(search));
            qb.push(" ESCAPE '\\'");
        }
        qb.push(" ORDER BY id");

        let authors = qb.build_query_as::<Author>().fetch_all(&self.pool).await?;
        Ok(authors)
    }

    async fn get_author(&self, id: AuthorId) -> DbResult<Author> {
        sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found(e, format!("Author not found: {}", id)))
    }

    async fn create_author(&self, name: &str) -> DbResult<Author> {
        let id = sqlx::query("INSERT INTO authors (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Author {
            id,
            name: name.to_string(),
        })
    }

    async fn get_or_create_author(&self, name: &str) -> DbResult<Author> {
        let existing = sqlx::query_as::<_, Author>(
            "SELECT id, name FROM authors WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(author) => Ok(author),
            None => self.create_author(name).await,
        }
    }

    async fn update_author(&self, id: AuthorId, name: &str) -> DbResult<Author> {
        let result = sqlx::query("UPDATE authors SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Author not found: {}", id)));
        }
        Ok(Author {
            id,
            name: name.to_string(),
        })
    }

    async fn delete_author(&self, id: AuthorId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Author not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepo for SqliteRepository {
    async fn list_books(&self, search: Option<&str>) -> DbResult<Vec<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new(BOOK_SELECT);
        qb.push(" WHERE 1=1");
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (b.title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.name LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY b.id");

        let rows = qb.build_query_as::<BookRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn get_book(&self, id: BookId) -> DbResult<Book> {
        let query = format!("{} WHERE b.id = ?", BOOK_SELECT);
        sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(Book::from)
            .map_err(|e| not_found(e, format!("Book not found: {}", id)))
    }

    async fn create_book(&self, title: &str, author_name: &str) -> DbResult<Book> {
        let author = self.get_or_create_author(author_name).await?;

        let id = sqlx::query("INSERT INTO books (title, authorid) VALUES (?, ?)")
            .bind(title)
            .bind(author.id)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Book {
            id,
            title: title.to_string(),
            author,
        })
    }

    async fn update_book(
        &self,
        id: BookId,
        title: Option<&str>,
        author_name: Option<&str>,
    ) -> DbResult<Book> {
        let current = self.get_book(id).await?;

        let author = match author_name {
            Some(name) if name != current.author.name => self.get_or_create_author(name).await?,
            _ => current.author,
        };
        let title = title.unwrap_or(&current.title).to_string();

        sqlx::query("UPDATE books SET title = ?, authorid = ? WHERE id = ?")
            .bind(&title)
            .bind(author.id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Book { id, title, author })
    }

    async fn delete_book(&self, id: BookId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Book not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl FavoriteRepo for SqliteRepository {
    async fn favorites_for_user(&self, user_id: &str) -> DbResult<Vec<Favorite>> {
        let query = format!("{} WHERE f.userid = ? ORDER BY f.id", FAVORITE_SELECT);
        let results = sqlx::query_as::<_, FavoriteTuple>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(results.into_iter().map(favorite_from_tuple).collect())
    }

    async fn get_favorite(&self, user_id: &str, id: i64) -> DbResult<Favorite> {
        let query = format!("{} WHERE f.userid = ? AND f.id = ?", FAVORITE_SELECT);
        sqlx::query_as::<_, FavoriteTuple>(&query)
            .bind(user_id)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(favorite_from_tuple)
            .map_err(|e| not_found(e, format!("Favorite not found: {}", id)))
    }

    async fn add_favorite(&self, user_id: &str, book_id: BookId) -> DbResult<Favorite> {
        let book = self.get_book(book_id).await?;

        let id = sqlx::query("INSERT INTO favorites (userid, bookid) VALUES (?, ?)")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(|e| already_exists(e, format!("Book {} is already a favorite", book_id)))?
            .last_insert_rowid();

        debug!(user = user_id, book = book_id, "favorite added");

        Ok(Favorite {
            id,
            userid: user_id.to_string(),
            book,
        })
    }

    async fn delete_favorite(&self, user_id: &str, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE userid = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Favorite not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for SqliteRepository {
    async fn all_books_excluding(&self, exclude: &[BookId]) -> DbResult<Vec<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new(BOOK_SELECT);
        qb.push(" WHERE 1=1");
        push_not_in(&mut qb, "b.id", exclude);
        qb.push(" ORDER BY b.id");

        let rows = qb.build_query_as::<BookRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn books_by_authors_excluding(
        &self,
        authors: &[AuthorId],
        exclude: &[BookId],
        limit: usize,
    ) -> DbResult<Vec<Book>> {
        if authors.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(BOOK_SELECT);
        qb.push(" WHERE b.authorid IN (");
        let mut separated = qb.separated(", ");
        for author in authors {
            separated.push_bind(*author);
        }
        separated.push_unseparated(")");
        push_not_in(&mut qb, "b.id", exclude);
        qb.push(" ORDER BY b.id LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build_query_as::<BookRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::recommend::SeededSampler;

    pub(crate) async fn memory_repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:", 1)
            .await
            .expect("in-memory database should open")
    }

    pub(crate) async fn seed_user(repo: &SqliteRepository, id: &str) {
        repo.insert_user(&User {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{}@example.com", id),
            password: String::new(),
            created: None,
            lastlogin: None,
        })
        .await
        .expect("seed user");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dune"), "%dune%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_create_book_reuses_author() {
        let repo = memory_repo().await;
        let a = repo.create_book("Dune", "Frank Herbert").await.unwrap();
        let b = repo.create_book("Dune Messiah", "Frank Herbert").await.unwrap();
        assert_eq!(a.author, b.author);
        assert_eq!(repo.list_authors(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_books_search_title_or_author() {
        let repo = memory_repo().await;
        repo.create_book("Dune", "Frank Herbert").await.unwrap();
        repo.create_book("The Hobbit", "J.R.R. Tolkien").await.unwrap();
        repo.create_book("Foundation", "Isaac Asimov").await.unwrap();

        let by_title = repo.list_books(Some("hob")).await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "The Hobbit");

        let by_author = repo.list_books(Some("asimov")).await.unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].title, "Foundation");

        assert_eq!(repo.list_books(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_book() {
        let repo = memory_repo().await;
        let book = repo.create_book("Dnue", "Frank Herbert").await.unwrap();

        let updated = repo.update_book(book.id, Some("Dune"), None).await.unwrap();
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.author.name, "Frank Herbert");

        let moved = repo.update_book(book.id, None, Some("Brian Herbert")).await.unwrap();
        assert_eq!(moved.title, "Dune");
        assert_eq!(moved.author.name, "Brian Herbert");

        repo.delete_book(book.id).await.unwrap();
        assert!(matches!(repo.get_book(book.id).await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.delete_book(book.id).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_author_cascades_to_books() {
        let repo = memory_repo().await;
        let book = repo.create_book("Dune", "Frank Herbert").await.unwrap();
        repo.delete_author(book.author.id).await.unwrap();
        assert!(repo.list_books(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_are_unique_per_user() {
        let repo = memory_repo().await;
        seed_user(&repo, "alice").await;
        let book = repo.create_book("Dune", "Frank Herbert").await.unwrap();

        let fav = repo.add_favorite("alice", book.id).await.unwrap();
        assert_eq!(fav.book, book);
        assert!(matches!(
            repo.add_favorite("alice", book.id).await,
            Err(DbError::AlreadyExists(_))
        ));
        assert!(matches!(
            repo.add_favorite("alice", 999).await,
            Err(DbError::NotFound(_))
        ));

        let favorites = repo.favorites_for_user("alice").await.unwrap();
        assert_eq!(favorites, vec![fav.clone()]);

        assert!(matches!(
            repo.delete_favorite("bob", fav.id).await,
            Err(DbError::NotFound(_))
        ));
        repo.delete_favorite("alice", fav.id).await.unwrap();
        assert!(repo.favorites_for_user("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_exclusion_queries() {
        let repo = memory_repo().await;
        let dune = repo.create_book("Dune", "Frank Herbert").await.unwrap();
        let messiah = repo.create_book("Dune Messiah", "Frank Herbert").await.unwrap();
        let children = repo.create_book("Children of Dune", "Frank Herbert").await.unwrap();
        let hobbit = repo.create_book("The Hobbit", "J.R.R. Tolkien").await.unwrap();

        let rest = repo.all_books_excluding(&[dune.id]).await.unwrap();
        let ids: Vec<BookId> = rest.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![messiah.id, children.id, hobbit.id]);

        let same_author = repo
            .books_by_authors_excluding(&[dune.author.id], &[dune.id], 1)
            .await
            .unwrap();
        assert_eq!(same_author, vec![messiah.clone()]);

        assert!(repo
            .books_by_authors_excluding(&[], &[], 5)
            .await
            .unwrap()
            .is_empty());

        let sampler = SeededSampler::new(7);
        let random = repo
            .random_books_excluding(&[dune.id, messiah.id, children.id], 3, &sampler)
            .await
            .unwrap();
        assert_eq!(random, vec![hobbit]);
    }

    #[tokio::test]
    async fn test_token_roundtrip_and_revoke() {
        let repo = memory_repo().await;
        seed_user(&repo, "alice").await;
        let token = AccessToken {
            token: "t1".to_string(),
            userid: "alice".to_string(),
            created: Some(Utc::now()),
            lastused: None,
        };
        repo.insert_token(&token).await.unwrap();
        repo.touch_token("t1").await.unwrap();
        assert!(repo.get_token("t1").await.unwrap().lastused.is_some());

        repo.flush_token_cache().await.unwrap();
        repo.delete_token("t1").await.unwrap();
        assert!(matches!(repo.get_token("t1").await, Err(DbError::NotFound(_))));
    }
}
