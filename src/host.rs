//! Extension host owning the `calculate` and `damage` loaders
//!
//! Callers receive the host (or a facade built from it) explicitly instead of
//! reaching into process-wide state.

use crate::calculate::{Calculator, CALCULATE_MODULE};
use crate::config::ExtensionConfig;
use crate::damage::{DamageClassifier, DAMAGE_MODULE};
use crate::extension::{ExtensionLoader, ReloadOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ExtensionHost {
    calculate: Arc<ExtensionLoader>,
    damage: Arc<ExtensionLoader>,
}

impl ExtensionHost {
    #[must_use]
    pub fn new(calculate: Arc<ExtensionLoader>, damage: Arc<ExtensionLoader>) -> Self {
        Self { calculate, damage }
    }

    /// Build both loaders from configuration. No module is read yet.
    #[must_use]
    pub fn from_config(config: &ExtensionConfig) -> Self {
        let options = config.load_options();
        Self::new(
            Arc::new(ExtensionLoader::new(
                CALCULATE_MODULE,
                config.calculate_path(),
                options,
            )),
            Arc::new(ExtensionLoader::new(DAMAGE_MODULE, config.damage_path(), options)),
        )
    }

    #[must_use]
    pub fn calculator(&self) -> Calculator {
        Calculator::new(Arc::clone(&self.calculate))
    }

    #[must_use]
    pub fn damage(&self) -> DamageClassifier {
        DamageClassifier::new(Arc::clone(&self.damage))
    }

    #[must_use]
    pub fn loaders(&self) -> [&Arc<ExtensionLoader>; 2] {
        [&self.calculate, &self.damage]
    }

    /// Look up a loader by module name
    #[must_use]
    pub fn loader(&self, module: &str) -> Option<&Arc<ExtensionLoader>> {
        self.loaders()
            .into_iter()
            .find(|loader| loader.name() == module)
    }

    pub fn reload_all(&self) -> Vec<(&'static str, ReloadOutcome)> {
        self.loaders()
            .into_iter()
            .map(|loader| (loader.name(), loader.reload()))
            .collect()
    }

    /// Reload modules whose file appeared or changed, every `period`, until
    /// `shutdown` resolves
    pub async fn watch<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut watcher = ModuleWatcher::new(self.loaders().into_iter().cloned());
        let mut ticker = tokio::time::interval(period);
        tokio::pin!(shutdown);

        info!("Watching extension modules every {:?}", period);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Stopping extension watcher");
                    break;
                }
                _ = ticker.tick() => {
                    watcher.poll();
                }
            }
        }
    }
}

/// Change poller for extension module files
pub struct ModuleWatcher {
    entries: Vec<WatchedModule>,
}

struct WatchedModule {
    loader: Arc<ExtensionLoader>,
    stamp: Option<FileStamp>,
}

/// Modification time plus length; a save within the mtime granularity
/// still shows up as a length change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

fn stamp_of(loader: &ExtensionLoader) -> Option<FileStamp> {
    let meta = std::fs::metadata(loader.path()).ok()?;
    Some(FileStamp {
        modified: meta.modified().ok()?,
        len: meta.len(),
    })
}

impl ModuleWatcher {
    /// Record the current stamp of every module. Files already present are
    /// not reloaded until they change.
    pub fn new(loaders: impl IntoIterator<Item = Arc<ExtensionLoader>>) -> Self {
        let entries = loaders
            .into_iter()
            .map(|loader| WatchedModule {
                stamp: stamp_of(&loader),
                loader,
            })
            .collect();
        Self { entries }
    }

    /// Reload every module whose file appeared or changed since the last poll
    pub fn poll(&mut self) -> Vec<(&'static str, ReloadOutcome)> {
        let mut outcomes = Vec::new();

        for entry in &mut self.entries {
            let current = stamp_of(&entry.loader);
            if current == entry.stamp {
                continue;
            }
            entry.stamp = current;

            if current.is_none() {
                debug!(
                    "Extension module {} was removed; keeping published registry",
                    entry.loader.name()
                );
                continue;
            }

            debug!("Extension module {} changed on disk", entry.loader.name());
            outcomes.push((entry.loader.name(), entry.loader.reload()));
        }

        outcomes
    }
}
