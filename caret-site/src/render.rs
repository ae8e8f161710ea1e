//! Template rendering for HTTP responses.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

/// Shown when a page fails to render
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate;

/// Render a template as an HTML response with the given status.
///
/// A render failure is logged and answered with a generic 500 page.
pub fn html_with_status<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!("Template error: {}", e);
            let body = ErrorTemplate
                .render()
                .unwrap_or_else(|_| "Something went wrong".to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
        }
    }
}

pub fn html<T: Template>(template: &T) -> Response {
    html_with_status(StatusCode::OK, template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fmt;

    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[derive(Template)]
    #[template(source = "<p>{{ value }}</p>", ext = "html")]
    struct BrokenTemplate {
        value: Broken,
    }

    #[derive(Template)]
    #[template(source = "<p>{{ value }}</p>", ext = "html")]
    struct FineTemplate {
        value: &'static str,
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_render_failure_is_generic_500() {
        let response = html(&BrokenTemplate { value: Broken });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_text(response).await;
        assert!(body.contains("Something went wrong"));
        assert!(!body.contains("Template error"));
    }

    #[tokio::test]
    async fn test_render_success_keeps_status() {
        let response = html_with_status(StatusCode::NOT_FOUND, &FineTemplate { value: "hi" });
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "<p>hi</p>");
    }
}
