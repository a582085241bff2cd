//! Meme domain - DB queries for the memes table
//!
//! All functions take a generic sqlx Executor; the pipeline passes `&PgPool`.

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{KnownItem, NewMeme};

/// Bulk read of every persisted meme's identity hashes, for the run-scoped
/// known-item index.
pub async fn all_known_items<'e, E>(executor: E) -> Result<Vec<KnownItem>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, content_hash, phash FROM memes")
        .fetch_all(executor)
        .await
}

/// Insert a batch of new memes in one statement, returning the number of
/// rows the store acknowledged. Callers must not pass an empty batch
/// (`push_values` would produce invalid SQL).
pub async fn insert_batch<'e, E>(executor: E, rows: &[NewMeme]) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO memes (title, image_url, source_url, author, score, \
         content_hash, phash, nsfw_score, duplicate_of, status) ",
    );

    builder.push_values(rows, |mut b, row| {
        b.push_bind(&row.title)
            .push_bind(&row.image_url)
            .push_bind(&row.source_url)
            .push_bind(&row.author)
            .push_bind(row.score)
            .push_bind(&row.content_hash)
            .push_bind(&row.phash)
            .push_bind(row.nsfw_score)
            .push_bind(row.duplicate_of)
            .push_bind(row.status);
    });
    builder.push(" RETURNING id");

    let inserted: Vec<(Uuid,)> = builder.build_query_as().fetch_all(executor).await?;
    Ok(inserted.len() as u64)
}
