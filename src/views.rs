//! Server-rendered homepage.

use crate::models::PostDocument;

/// Escape text for use in HTML bodies and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn homepage(posts: &[PostDocument], logged_in: bool) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>Just Tech News</title>\n</head>\n<body>\n<header>\n<h1><a href=\"/\">Just Tech News</a></h1>\n<nav>",
    );

    if logged_in {
        html.push_str("<button id=\"logout\" type=\"button\">logout</button>");
    }
    html.push_str("</nav>\n</header>\n<main>\n<ol class=\"posts\">\n");

    for post in posts {
        let author = post.user.as_ref().map(|u| u.username.as_str()).unwrap_or("unknown");
        let points = if post.vote_count == 1 { "point" } else { "points" };
        let comments = if post.comments.len() == 1 { "comment" } else { "comments" };

        html.push_str(&format!(
            "<li class=\"post\">\n<a class=\"title\" href=\"{url}\" target=\"_blank\">{title}</a>\n\
             <p class=\"meta\">{votes} {points} by {author} on {date} | \
             <a href=\"/api/posts/{id}\">{count} {comments}</a></p>\n</li>\n",
            url = escape(&post.post_url),
            title = escape(&post.title),
            votes = post.vote_count,
            author = escape(author),
            date = post.created_at.format("%-m/%-d/%Y"),
            id = post.id,
            count = post.comments.len(),
        ));
    }

    html.push_str("</ol>\n</main>\n");
    if logged_in {
        html.push_str("<script src=\"/javascript/logout.js\"></script>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}
