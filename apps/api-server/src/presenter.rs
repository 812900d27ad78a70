//! Domain to DTO conversions for HTTP responses.

use quire_core::domain::{Author, CommentView, Page, PostDetail, PostSummary, TagCount, User};
use quire_shared::dto::{
    AuthorResponse, CommentResponse, PostDetailResponse, PostResponse, TagCountResponse,
    UserResponse,
};
use quire_shared::{PageMeta, PaginatedResponse};

pub fn user(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        created_at: user.created_at,
    }
}

fn author(author: Author) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        name: author.name,
    }
}

pub fn post(summary: PostSummary) -> PostResponse {
    let PostSummary { post, author: by, tags } = summary;
    PostResponse {
        id: post.id,
        title: post.title,
        slug: post.slug,
        excerpt: post.excerpt,
        is_published: post.is_published,
        is_featured: post.is_featured,
        published_at: post.published_at,
        created_at: post.created_at,
        updated_at: post.updated_at,
        author: by.map(author),
        tags,
    }
}

pub fn post_detail(detail: PostDetail) -> PostDetailResponse {
    let body = detail.summary.post.body.clone();
    PostDetailResponse {
        post: post(detail.summary),
        body,
        body_html: detail.rendered_body,
        excerpt_html: detail.rendered_excerpt,
        comments_count: detail.comments_count,
    }
}

pub fn comment(view: CommentView) -> CommentResponse {
    let CommentView {
        comment,
        author: by,
        parent,
        replies,
    } = view;

    let replies: Vec<CommentResponse> = replies.into_iter().map(self::comment).collect();
    CommentResponse {
        id: comment.id,
        blog_post_id: comment.blog_post_id,
        is_reply: comment.is_reply(),
        content: comment.content,
        is_approved: comment.is_approved,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        user: by.map(author),
        parent: parent.map(|p| Box::new(self::comment(*p))),
        replies_count: replies.len(),
        replies,
    }
}

pub fn tag_count(count: TagCount) -> TagCountResponse {
    TagCountResponse {
        name: count.tag.name,
        slug: count.tag.slug,
        posts_count: count.posts_count,
    }
}

pub fn page<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
    let meta = PageMeta::new(page.page, page.per_page, page.total);
    PaginatedResponse {
        data: page.items.into_iter().map(f).collect(),
        meta,
    }
}
