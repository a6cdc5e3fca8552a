//! Documentation landing page

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
};
use pulldown_cmark::{html, Options, Parser};
use tracing::debug;

use super::state::AppState;

const EMBEDDED_DOCS: &str = include_str!("../../docs/API.md");

/// GET / - renders the configured Markdown file, or the bundled API reference
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let markdown = match tokio::fs::read_to_string(&state.docs_path).await {
        Ok(markdown) => markdown,
        Err(e) => {
            debug!(path = %state.docs_path.display(), error = %e, "Serving embedded docs");
            EMBEDDED_DOCS.to_string()
        }
    };

    Html(render_page(&markdown))
}

/// Unknown routes land on the documentation page
pub async fn redirect_home() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/")])
}

fn render_page(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, Parser::new_ext(markdown, options));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Dispatch Gateway</title>\n\
         <style>body{{font-family:sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem}}\
         pre{{background:#f4f4f4;padding:.75rem;overflow-x:auto}}\
         table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:.25rem .5rem}}</style>\n\
         </head>\n<body>\n{}</body>\n</html>\n",
        body
    )
}
