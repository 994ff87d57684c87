//! Assembles a [`Site`] from the loaded configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use quire_cache::{Cache, FileCache, NullCache};
use quire_config::Config;
use quire_renderer::{ArtifactSink, MarkdownRenderer};
use quire_site::{
    ComponentRegistry, GitTimeSource, OutputSink, OverrideTable, Site, StaticTimeSource,
    TimeSource, parse_cutoff,
};
use quire_storage::{FsStorage, Storage};
use quire_typeset::{
    CachedTypesetter, KrokiTypesetter, RemoteImageProbe, TYPESET_BUCKET, TypstTypesetter,
};

use crate::error::CliError;

/// Application version, used to invalidate the typeset cache.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A site plus the storage it reads from.
pub(crate) struct Assembled {
    pub site: Site,
    pub storage: Arc<FsStorage>,
}

/// Build every collaborator the configuration asks for.
pub(crate) fn assemble(config: &Config) -> Result<Assembled, CliError> {
    let project = &config.project;
    let storage = Arc::new(
        FsStorage::new(project.root.clone())
            .with_debounce(Duration::from_millis(config.watch.debounce_ms)),
    );

    let cache: Box<dyn Cache> = if project.cache_enabled {
        ensure_state_dir(&project.state_dir())?;
        Box::new(FileCache::new(project.cache_dir(), VERSION))
    } else {
        Box::new(NullCache)
    };

    let sink: Arc<dyn ArtifactSink> =
        Arc::new(OutputSink::new(project.output_dir.clone(), project.alias.clone()));

    let components = ComponentRegistry::new(
        config.components_resolved.dir.clone(),
        config.components_resolved.import_prefix.clone(),
    );

    let site = Site::new(
        Arc::clone(&storage) as Arc<dyn Storage>,
        renderer(config, cache.as_ref()),
        sink,
        time_source(config)?,
        components,
    );
    Ok(Assembled { site, storage })
}

fn renderer(config: &Config, cache: &dyn Cache) -> MarkdownRenderer {
    let typeset = &config.typeset;
    let timeout = Duration::from_secs(typeset.timeout_secs);

    let typst = TypstTypesetter::new(typeset.typst.clone(), typeset.languages.clone());
    let mut renderer = MarkdownRenderer::new().with_typesetter(Arc::new(CachedTypesetter::new(
        typst,
        cache.bucket(TYPESET_BUCKET),
    )));

    if let Some(url) = &typeset.kroki_url {
        let kroki = KrokiTypesetter::new(url, timeout);
        renderer = renderer.with_typesetter(Arc::new(CachedTypesetter::new(
            kroki,
            cache.bucket(TYPESET_BUCKET),
        )));
    }
    if typeset.image_probe {
        renderer = renderer.with_image_probe(Arc::new(RemoteImageProbe::new(timeout)));
    }
    renderer
}

fn time_source(config: &Config) -> Result<Arc<dyn TimeSource>, CliError> {
    let time = &config.time_resolved;
    let overrides = match &time.overrides {
        Some(path) => OverrideTable::load(path)?,
        None => OverrideTable::default(),
    };

    if time.git {
        let cutoff = parse_cutoff(&time.cutoff)?;
        Ok(Arc::new(GitTimeSource::new(
            config.project.root.clone(),
            overrides,
            cutoff,
        )))
    } else {
        Ok(Arc::new(StaticTimeSource::new(overrides)))
    }
}

/// Ensure the `.quire/` state directory exists with a `.gitignore`.
fn ensure_state_dir(state_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(state_dir)?;

    let gitignore_path = state_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by quire\n*\n");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ensure_state_dir_writes_gitignore_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join(".quire");

        ensure_state_dir(&state).unwrap();
        std::fs::write(state.join(".gitignore"), "custom\n").unwrap();
        ensure_state_dir(&state).unwrap();

        assert_eq!(std::fs::read_to_string(state.join(".gitignore")).unwrap(), "custom\n");
    }

    #[test]
    fn test_assemble_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_with_base(dir.path());
        config.time_resolved.git = false;

        let assembled = assemble(&config).unwrap();

        assert!(assembled.site.entries().is_empty());
        assert_eq!(assembled.storage.root(), dir.path());
        assert!(dir.path().join(".quire/.gitignore").exists());
    }

    #[test]
    fn test_missing_override_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_with_base(dir.path());
        config.time_resolved.overrides = Some(dir.path().join("missing.yml"));

        assert!(matches!(time_source(&config), Err(CliError::Time(_))));
    }
}
