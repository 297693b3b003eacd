//! Server-rendered stats page.
//!
//! Built from the durable table rather than the in-memory counters, so it
//! shows what would survive a restart.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::stats::PathStat;

pub async fn get_dashboard(State(state): State<AppState>) -> Response {
    match state.stats.persisted().await {
        Ok(rows) => Html(render(&rows)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read stats for dashboard");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read stats").into_response()
        }
    }
}

fn render(rows: &[PathStat]) -> String {
    let mut html = String::from(
        "<html><head><title>Gateway Stats</title></head><body>\
         <h1>Gateway Monitoring Dashboard</h1>\
         <table border=\"1\"><tr><th>Path</th><th>Success</th><th>Fail</th></tr>",
    );
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.path),
            row.success,
            row.fail
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_rows() {
        let html = render(&[PathStat { path: "/api".into(), success: 3, fail: 1 }]);
        assert!(html.contains("<tr><td>/api</td><td>3</td><td>1</td></tr>"));
        assert!(html.ends_with("</table></body></html>"));
    }

    #[test]
    fn test_paths_are_escaped() {
        let html = render(&[PathStat { path: "/<script>".into(), success: 0, fail: 1 }]);
        assert!(html.contains("/&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
