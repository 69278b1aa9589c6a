use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::engine::{BrainGeneration, DialogueEngine, EngineError};
use super::vars::{VariableSet, VariableStore};

/// Produces a fresh, empty engine for each generation.
pub type EngineFactory = Box<dyn Fn() -> Box<dyn DialogueEngine> + Send>;

/// A file-level change in one of the watched brain directories.
#[derive(Debug, Clone)]
pub struct BrainChange {
    pub path: Option<PathBuf>,
}

/// Owns the live engine generation and rebuilds it when the knowledge base
/// changes on disk, persisting learned variables across the swap. Reload
/// cycles run on the reactor loop, so conversational traffic never sees a
/// half-built generation and at most one reload is ever in flight.
pub struct BrainReloadCoordinator {
    factory: EngineFactory,
    global_dir: PathBuf,
    overlay_dir: PathBuf,
    store: VariableStore,
    live: BrainGeneration,
}

impl BrainReloadCoordinator {
    /// Initial load. A global-tier failure is fatal here; an absent identity
    /// overlay is not. Previously persisted variables are restored onto the
    /// first generation.
    pub fn bootstrap(
        factory: EngineFactory,
        global_dir: PathBuf,
        overlay_dir: PathBuf,
        store: VariableStore,
    ) -> Result<Self, EngineError> {
        let engine = Self::build(&factory, &global_dir, &overlay_dir)?;
        let mut coordinator = Self {
            factory,
            global_dir,
            overlay_dir,
            store,
            live: BrainGeneration { seq: 0, engine },
        };
        coordinator.restore_variables();
        Ok(coordinator)
    }

    /// Load both tiers into a fresh engine: the global directory first (its
    /// failure aborts the build), then the identity overlay (bots may not
    /// have one, so its failure is tolerated).
    fn build(
        factory: &EngineFactory,
        global_dir: &Path,
        overlay_dir: &Path,
    ) -> Result<Box<dyn DialogueEngine>, EngineError> {
        let mut engine = factory();
        engine.load_directory(global_dir)?;
        engine.finalize();
        match engine.load_directory(overlay_dir) {
            Ok(()) => engine.finalize(),
            Err(error) => debug!(%error, "no identity overlay loaded"),
        }
        Ok(engine)
    }

    pub fn engine(&mut self) -> &mut dyn DialogueEngine {
        self.live.engine.as_mut()
    }

    pub fn generation(&self) -> u64 {
        self.live.seq
    }

    /// Snapshot the live engine's variable tiers.
    pub fn export(&self) -> VariableSet {
        VariableSet {
            global: self.live.engine.variables(),
            per_user: self.live.engine.user_variables(),
        }
    }

    /// Persist the live variable set; a disk fault is logged, not fatal.
    pub fn persist(&self) {
        if let Err(error) = self.store.save(&self.export()) {
            warn!(%error, "variables could not be persisted");
        }
    }

    fn restore_variables(&mut self) {
        let vars = self.store.load();
        for (name, value) in &vars.global {
            self.live.engine.set_variable(name, value);
        }
        for (identity, map) in vars.per_user {
            self.live.engine.set_user_variables(&identity, map);
        }
    }

    /// One full reload cycle: persist the current variable set, rebuild,
    /// swap the live generation, restore variables onto it. On a global-tier
    /// failure the previous generation stays live and the cycle is a no-op.
    pub fn reload(&mut self) {
        self.persist();
        match Self::build(&self.factory, &self.global_dir, &self.overlay_dir) {
            Ok(engine) => {
                self.live = BrainGeneration {
                    seq: self.live.seq + 1,
                    engine,
                };
                self.restore_variables();
                info!(generation = self.live.seq, "brain reloaded");
            }
            Err(error) => {
                warn!(%error, "brain reload failed, keeping previous generation");
            }
        }
    }
}

/// Watch the brain tiers one subdirectory level deep, bridging change events
/// into the reactor's channel. The initial scan emits nothing; every later
/// file-level event triggers a reload cycle, deliberately undebounced.
///
/// The directory tree is re-scanned on every event, so a tier directory that
/// appears after startup (a first identity overlay) and topic subdirectories
/// created inside a watched tier come under watch as soon as their creation
/// is observed. While a tier directory is absent its nearest existing
/// ancestor is watched in its place, purely so the creation shows up.
///
/// A dedicated thread owns the watcher; it exits once the reactor side of
/// the channel is gone.
pub fn watch_brain_dirs(dirs: Vec<PathBuf>, tx: mpsc::Sender<BrainChange>) -> notify::Result<()> {
    let (raw_tx, raw_rx) = std_mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        let _ = raw_tx.send(result);
    })?;

    let mut watched = HashSet::new();
    rescan(&mut watcher, &dirs, &mut watched);

    thread::spawn(move || {
        while let Ok(result) = raw_rx.recv() {
            match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    // Newly created directories come under watch before the
                    // change is reported, so nothing inside them is missed.
                    let tier_appeared = rescan(&mut watcher, &dirs, &mut watched);
                    let in_tier = event.paths.iter().any(|path| within_tier(path, &dirs));
                    if !tier_appeared && !in_tier {
                        // Ancestor noise while a tier directory is absent,
                        // e.g. the variable documents next to the overlay.
                        continue;
                    }
                    let change = BrainChange {
                        path: event.paths.first().cloned(),
                    };
                    if tx.blocking_send(change).is_err() {
                        break;
                    }
                }
                Err(error) => debug!(%error, "watcher error"),
            }
        }
    });
    Ok(())
}

/// Walk the configured tiers and watch whatever exists now but is not yet
/// watched. Returns whether a tier directory itself came under watch, which
/// counts as a change in its own right.
fn rescan(
    watcher: &mut RecommendedWatcher,
    dirs: &[PathBuf],
    watched: &mut HashSet<PathBuf>,
) -> bool {
    let mut tier_appeared = false;
    for dir in dirs {
        if dir.is_dir() {
            if watch_once(watcher, dir, watched) {
                tier_appeared = true;
            }
            // One level of subdirectory depth: topic folders inside a tier.
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        watch_once(watcher, &path, watched);
                    }
                }
            }
        } else if let Some(ancestor) = dir.ancestors().skip(1).find(|p| p.is_dir()) {
            watch_once(watcher, ancestor, watched);
        }
    }
    tier_appeared
}

fn watch_once(watcher: &mut RecommendedWatcher, path: &Path, watched: &mut HashSet<PathBuf>) -> bool {
    if watched.contains(path) {
        return false;
    }
    match watcher.watch(path, RecursiveMode::NonRecursive) {
        Ok(()) => watched.insert(path.to_path_buf()),
        Err(error) => {
            debug!(dir = %path.display(), %error, "brain directory not watchable");
            false
        }
    }
}

fn within_tier(path: &Path, dirs: &[PathBuf]) -> bool {
    dirs.iter().any(|dir| {
        // Event paths are absolute; configured tiers may be relative.
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        path.starts_with(&dir)
    })
}
