//! Server-rendered HTML
//!
//! Handlers build a [`Page`] from one of the body renderers below. All
//! user-supplied text goes through [`escape`].

use std::fmt::Write;

use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use quire_core::User;

use crate::db::PostWithAuthor;
use crate::http::cookies;
use crate::http::extractors::Flash;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// A full HTML page with navigation and pending messages.
#[derive(Debug)]
pub struct Page {
    title: &'static str,
    body: String,
    viewer: Option<User>,
    messages: Vec<String>,
    clear_flash: bool,
}

impl Page {
    pub fn new(title: &'static str, body: String) -> Self {
        Self {
            title,
            body,
            viewer: None,
            messages: Vec::new(),
            clear_flash: false,
        }
    }

    pub fn viewer(mut self, viewer: Option<User>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Show the pending flash and clear its cookie.
    pub fn flash(mut self, Flash(flash): Flash) -> Self {
        if let Some(message) = flash {
            self.messages.push(message);
            self.clear_flash = true;
        }
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    fn render(&self) -> String {
        let mut nav = String::from(r#"<a href="/">Home</a> <a href="/posts">Posts</a>"#);
        match &self.viewer {
            Some(user) => {
                let _ = write!(
                    nav,
                    concat!(
                        r#" <a href="/posts/create">New Post</a>"#,
                        r#" <a href="/profile">{}</a> <a href="/logout">Logout</a>"#,
                    ),
                    escape(&user.username)
                );
            }
            None => nav.push_str(r#" <a href="/login">Login</a> <a href="/register">Register</a>"#),
        }

        let mut messages = String::new();
        for message in &self.messages {
            let _ = write!(messages, r#"<div class="flash">{}</div>"#, escape(message));
        }

        format!(
            "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
             <title>{title} - Quire</title></head>\
             <body><nav>{nav}</nav>{messages}<main>{body}</main></body></html>",
            title = escape(self.title),
            body = self.body,
        )
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let html = Html(self.render());
        if self.clear_flash {
            (cookies::without_flash(CookieJar::new()), html).into_response()
        } else {
            html.into_response()
        }
    }
}

fn post_summary(out: &mut String, post: &PostWithAuthor) {
    let _ = write!(
        out,
        concat!(
            r#"<article><h2><a href="/posts/{id}">{title}</a></h2>"#,
            r#"<p class="meta">by {author} on {date}</p></article>"#,
        ),
        id = post.id,
        title = escape(&post.title),
        author = escape(&post.username),
        date = post.created_at.format("%Y-%m-%d %H:%M"),
    );
}

fn post_list(heading: &str, posts: &[PostWithAuthor]) -> String {
    let mut out = format!("<h1>{heading}</h1>");
    if posts.is_empty() {
        out.push_str("<p>No posts yet.</p>");
    }
    for post in posts {
        post_summary(&mut out, post);
    }
    out
}

pub fn home(posts: &[PostWithAuthor]) -> String {
    post_list("Recent Posts", posts)
}

pub fn posts_list(posts: &[PostWithAuthor]) -> String {
    post_list("All Posts", posts)
}

pub fn post_detail(post: &PostWithAuthor) -> String {
    format!(
        concat!(
            r#"<article><h1>{title}</h1><p class="meta">by {author} on {date}</p>"#,
            r#"<div class="content">{content}</div></article>"#,
            r#"<a href="/posts">Back to posts</a>"#,
        ),
        title = escape(&post.title),
        author = escape(&post.username),
        date = post.created_at.format("%Y-%m-%d %H:%M"),
        content = escape(post.content.as_deref().unwrap_or_default()),
    )
}

pub fn post_form(title: &str, content: &str) -> String {
    format!(
        r#"<h1>New Post</h1><form method="post" action="/posts/create">
<label>Title <input name="title" maxlength="200" value="{title}" required></label>
<label>Content <textarea name="content">{content}</textarea></label>
<button type="submit">Create</button></form>"#,
        title = escape(title),
        content = escape(content),
    )
}

pub fn register_form(username: &str, email: &str) -> String {
    format!(
        r#"<h1>Register</h1><form method="post" action="/register">
<label>Username <input name="username" maxlength="80" value="{username}" required></label>
<label>Email <input name="email" type="email" maxlength="120" value="{email}" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Register</button></form>"#,
        username = escape(username),
        email = escape(email),
    )
}

pub fn login_form(username: &str) -> String {
    format!(
        r#"<h1>Login</h1><form method="post" action="/login">
<label>Username <input name="username" value="{username}" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Login</button></form>"#,
        username = escape(username),
    )
}

pub fn profile(user: &User) -> String {
    format!(
        concat!(
            r#"<h1>{username}</h1><dl><dt>Email</dt><dd>{email}</dd>"#,
            r#"<dt>Member since</dt><dd>{since}</dd></dl>"#,
        ),
        username = escape(&user.username),
        email = escape(&user.email),
        since = user.created_at.format("%Y-%m-%d"),
    )
}

pub fn not_found() -> String {
    let body = r#"<h1>Page not found</h1><p><a href="/">Go home</a></p>"#;
    Page::new("Not Found", body.into()).render()
}

pub fn server_error() -> String {
    Page::new(
        "Server Error",
        "<h1>Something went wrong</h1><p>The error has been logged.</p>".into(),
    )
    .render()
}
