//! List site content

use anyhow::Result;
use std::io::Write;

use crate::content::Collection;
use crate::Verdict;

/// List documents of one collection, or of all of them
pub async fn run(app: &Verdict, content_type: Option<&str>) -> Result<()> {
    let collections = match content_type {
        Some(kind) => vec![kind.parse::<Collection>().map_err(anyhow::Error::msg)?],
        None => Collection::ALL.to_vec(),
    };

    let mut out = Vec::new();
    write_listing(app, &collections, &mut out).await?;
    std::io::stdout().write_all(&out)?;
    Ok(())
}

async fn write_listing<W: Write>(app: &Verdict, collections: &[Collection], out: &mut W) -> Result<()> {
    for collection in collections {
        let entries = app.list_documents(*collection).await;
        writeln!(out, "{}s ({}):", collection.label(), entries.len())?;
        for entry in entries {
            writeln!(out, "  {} - {} [{}]", entry.slug, entry.title, entry.url_path())?;
        }
    }
    Ok(())
}
