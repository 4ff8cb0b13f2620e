//! Post creation, deletion and the feed projection.

use crate::domain::models::{CommentView, Post, PostView};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::{CommentRepository, LikeRepository, PostRepository};
use crate::services::feed_signal::FeedSignal;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct PostService {
    posts: PostRepository,
    comments: CommentRepository,
    likes: LikeRepository,
    signal: FeedSignal,
}

impl PostService {
    pub fn new(pool: PgPool, signal: FeedSignal) -> Self {
        Self {
            posts: PostRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            likes: LikeRepository::new(pool),
            signal,
        }
    }

    pub async fn create_post(
        &self,
        actor: Uuid,
        content: &str,
        image_url: Option<&str>,
    ) -> ServiceResult<Post> {
        let content = content.trim();
        if content.is_empty() && image_url.is_none() {
            return Err(ServiceError::Validation(
                "Post needs content or an image".into(),
            ));
        }

        let post = self.posts.create_post(actor, content, image_url).await?;
        self.signal.feed_changed().await;
        Ok(post)
    }

    /// Newest-first feed: each post enriched with author summary, comments in
    /// creation order, liking user ids and aggregate counts. Children are
    /// fetched in two batched queries keyed on the page's post ids.
    pub async fn get_feed(&self) -> ServiceResult<Vec<PostView>> {
        let posts = self.posts.list_with_authors().await?;
        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

        let comments = self.comments.list_for_posts(&post_ids).await?;
        let likes = self.likes.liking_users_for_posts(&post_ids).await?;

        let mut comments_by_post: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            let view = CommentView {
                id: comment.id,
                post_id: comment.post_id,
                content: comment.content.clone(),
                created_at: comment.created_at,
                author: comment.author_summary(),
            };
            comments_by_post.entry(comment.post_id).or_default().push(view);
        }

        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, user_id) in likes {
            likes_by_post.entry(post_id).or_default().push(user_id);
        }

        let feed = posts
            .into_iter()
            .map(|post| {
                let comments = comments_by_post.remove(&post.id).unwrap_or_default();
                let liked_by = likes_by_post.remove(&post.id).unwrap_or_default();
                PostView {
                    id: post.id,
                    content: post.content.clone(),
                    image_url: post.image_url.clone(),
                    created_at: post.created_at,
                    author: post.author_summary(),
                    like_count: liked_by.len() as i64,
                    comment_count: comments.len() as i64,
                    comments,
                    liked_by,
                }
            })
            .collect();

        Ok(feed)
    }

    /// Delete a post. Only the author may delete; comments, likes and related
    /// notifications cascade with the row.
    pub async fn delete_post(&self, actor: Uuid, post_id: Uuid) -> ServiceResult<()> {
        let author = self
            .posts
            .get_author(post_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Post not found".into()))?;

        if author != actor {
            return Err(ServiceError::Unauthorized(
                "Only the author can delete a post".into(),
            ));
        }

        self.posts.delete_post(post_id).await?;
        info!(%post_id, "post deleted");
        self.signal.feed_changed().await;
        Ok(())
    }
}
