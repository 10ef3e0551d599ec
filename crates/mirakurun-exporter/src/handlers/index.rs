use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::router::ExporterState;

pub async fn landing_page(State(state): State<Arc<ExporterState>>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Mirakurun Exporter</title></head>\n\
         <body>\n\
         <h1>Mirakurun Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        path = html_escape(&state.metrics_path)
    ))
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
