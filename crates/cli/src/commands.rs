//! Library maintenance commands. Each one writes its report to `out`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use narrator_audio::SilentResource;
use narrator_common::{
    NarratorConfig, PresentationData, PresentationId, SavedPresentation, now_millis,
};
use narrator_project::{
    DocumentStore, LoadedLibrary, PersistenceAdapter, create_export, migrate_legacy_document,
    read_import_file, write_export_file,
};
use narrator_session::{LocalGenerator, NarratorSession, Offline};
use tracing::info;

async fn load<S: DocumentStore>(library: &PersistenceAdapter<S>) -> Result<LoadedLibrary> {
    library.load().await.context("Failed to load the library")
}

fn find<'a>(saved: &'a [SavedPresentation], id: &str) -> Result<&'a SavedPresentation> {
    saved
        .iter()
        .find(|s| s.id.as_str() == id)
        .with_context(|| format!("No saved presentation with id {id}"))
}

pub async fn list<S: DocumentStore>(
    library: &PersistenceAdapter<S>,
    out: &mut impl Write,
) -> Result<()> {
    let loaded = load(library).await?;
    if loaded.saved_presentations.is_empty() {
        writeln!(out, "No saved presentations")?;
        return Ok(());
    }
    for saved in &loaded.saved_presentations {
        let active = loaded.active_presentation_id.as_ref() == Some(&saved.id);
        writeln!(
            out,
            "{} {:<28} {:<5} {:>3} slides  {}{}",
            if active { "*" } else { " " },
            saved.id.as_str(),
            if saved.is_draft() { "draft" } else { "saved" },
            saved.presentation_data.total_slides(),
            saved.name,
            if saved.has_audio() { "" } else { "  (no audio)" },
        )?;
    }
    Ok(())
}

pub async fn show<S: DocumentStore>(
    library: &PersistenceAdapter<S>,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let loaded = load(library).await?;
    let saved = find(&loaded.saved_presentations, id)?;
    writeln!(
        out,
        "{} ({} style, {} voice, {})",
        saved.name,
        saved.style.label(),
        saved.voice.label(),
        if saved.has_audio() { "narrated" } else { "no audio" },
    )?;
    write_outline(out, &saved.presentation_data)
}

fn write_outline(out: &mut impl Write, data: &PresentationData) -> Result<()> {
    writeln!(out, "{}", data.metadata.title)?;
    if !data.metadata.subtitle.is_empty() {
        writeln!(out, "{}", data.metadata.subtitle)?;
    }
    for (i, slide) in data.slides.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "{}. {}", i + 1, slide.title)?;
        for point in &slide.points {
            writeln!(out, "   - {point}")?;
        }
    }
    Ok(())
}

pub async fn export<S: DocumentStore>(
    library: &PersistenceAdapter<S>,
    id: &str,
    dir: &Path,
    out: &mut impl Write,
) -> Result<PathBuf> {
    let loaded = load(library).await?;
    let saved = find(&loaded.saved_presentations, id)?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = write_export_file(dir, &create_export(saved.into()))
        .await
        .context("Failed to write the export file")?;
    writeln!(out, "Exported \"{}\" to {}", saved.name, path.display())?;
    Ok(path)
}

pub async fn import<S: DocumentStore>(
    library: &PersistenceAdapter<S>,
    file: &Path,
    out: &mut impl Write,
) -> Result<PresentationId> {
    let document = read_import_file(file)
        .await
        .with_context(|| format!("Could not import {}", file.display()))?;
    let mut loaded = load(library).await?;

    let id = PresentationId::generate(PresentationId::SAVED_PREFIX);
    let name = document.name.clone();
    let saved = document.into_presentation().into_saved(id.clone(), now_millis());
    loaded.saved_presentations.insert(0, saved);
    library
        .save(
            &loaded.saved_presentations,
            loaded.active_presentation_id.as_ref(),
        )
        .await
        .context("Failed to save the library")?;

    writeln!(out, "Imported \"{name}\" as {id}")?;
    Ok(id)
}

pub async fn validate(file: &Path, out: &mut impl Write) -> Result<()> {
    let document = read_import_file(file)
        .await
        .with_context(|| format!("{} is not importable", file.display()))?;
    let preview = document.preview();
    writeln!(
        out,
        "{}: {} slides, {} style, {} voice",
        preview.name,
        preview.slide_count,
        preview.style.label(),
        preview.voice.label(),
    )?;
    Ok(())
}

pub async fn delete<S: DocumentStore>(
    library: &PersistenceAdapter<S>,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut loaded = load(library).await?;
    let before = loaded.saved_presentations.len();
    loaded.saved_presentations.retain(|s| s.id.as_str() != id);
    if loaded.saved_presentations.len() == before {
        bail!("No saved presentation with id {id}");
    }
    let active = loaded
        .active_presentation_id
        .filter(|active| active.as_str() != id);
    library
        .save(&loaded.saved_presentations, active.as_ref())
        .await
        .context("Failed to save the library")?;
    writeln!(out, "Deleted {id}")?;
    Ok(())
}

/// Run the offline generator over a notes file through a full session,
/// optionally saving the result.
pub async fn generate<S: DocumentStore>(
    config: &NarratorConfig,
    store: S,
    notes: &Path,
    save_as: Option<&str>,
    out: &mut impl Write,
) -> Result<Option<PresentationId>> {
    let text = tokio::fs::read_to_string(notes)
        .await
        .with_context(|| format!("Failed to read {}", notes.display()))?;

    let mut session = NarratorSession::new(
        config.clone(),
        store,
        SilentResource::new(),
        Box::new(LocalGenerator),
        Box::new(Offline),
    );
    session.init().await;
    session.end_tick();
    session.store_mut().set_content(text);
    session
        .generate_presentation()
        .await
        .context("Could not generate slides")?;

    let saved = match save_as {
        Some(name) => Some(session.save_presentation(name).await?),
        None => None,
    };
    if let Some(data) = session.store().presentation() {
        write_outline(out, data)?;
    }
    if let Some(id) = &saved {
        writeln!(out)?;
        writeln!(out, "Saved as {id}")?;
    }
    session.dispose().await;
    for notice in session.take_notices() {
        info!(level = ?notice.level, "{notice}");
    }
    Ok(saved)
}

pub async fn migrate<S: DocumentStore>(store: &S, legacy: &Path, out: &mut impl Write) -> Result<()> {
    let report = migrate_legacy_document(store, legacy)
        .await
        .with_context(|| format!("Failed to migrate {}", legacy.display()))?;
    let Some(report) = report else {
        writeln!(out, "Nothing to migrate")?;
        return Ok(());
    };
    writeln!(
        out,
        "Imported {} presentations ({} already present, {} invalid)",
        report.imported, report.skipped_existing, report.skipped_invalid,
    )?;
    if let Some(archived) = &report.archived_to {
        writeln!(out, "Legacy document archived to {}", archived.display())?;
    }
    Ok(())
}
