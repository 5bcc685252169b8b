//! Render a single page without starting the server

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::content::Collection;
use crate::Verdict;

/// Render a review or comparison to stdout, or to `output` when given
pub async fn run(app: &Verdict, kind: &str, slug: &str, output: Option<&Path>) -> Result<()> {
    let collection: Collection = kind.parse().map_err(anyhow::Error::msg)?;
    let html = render(app, collection, slug).await?;

    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Rendered {} to {:?}", collection.url_path(slug), path);
        }
        None => print!("{}", html),
    }
    Ok(())
}

async fn render(app: &Verdict, collection: Collection, slug: &str) -> Result<String> {
    app.render_document(collection, slug).await.with_context(|| {
        format!(
            "{} not found: {}",
            collection.label(),
            collection.document_path(&app.config().github, slug)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, MemorySource, WIDGET_X};
    use std::sync::Arc;

    fn app() -> Verdict {
        let source = MemorySource::new().with("reviews/widget-x.md", WIDGET_X);
        Verdict::with_source(test_config(), Arc::new(source))
    }

    #[tokio::test]
    async fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("widget-x.html");

        run(&app(), "review", "widget-x", Some(&output)).await.unwrap();

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("Hello <strong>world</strong>"));
    }

    #[tokio::test]
    async fn test_missing_document_is_an_error() {
        let err = render(&app(), Collection::Comparisons, "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Comparison not found: comparisons/nope.md");
    }
}
