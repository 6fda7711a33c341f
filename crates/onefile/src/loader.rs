//! Background loading of scene containers.
//!
//! [`LoadController`] runs at most one decode at a time on its own tokio
//! runtime and reports progress on a platform-agnostic `async_channel`:
//! a [`LoadEvent::Started`] is queued before the decode is spawned, and a
//! [`LoadEvent::Finished`] after the new model has been published. The
//! caller's thread never blocks on a load.
//!
//! Dropping the controller cancels any outstanding load and waits for the
//! background task to stop; no event is sent after the drop returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::{Receiver, Sender};
use onefile_decode::DecodeOptions;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::model::SceneModel;
use crate::source::{ContainerSource, FileSource};

/// Settings for a [`LoadController`].
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Bounds applied while decoding.
    pub decode: DecodeOptions,
    /// Worker threads of the controller's runtime.
    pub worker_threads: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            worker_threads: 1,
        }
    }
}

/// Lifecycle notification.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// A load was accepted; the model has been reset to empty.
    Started { path: PathBuf },
    /// The load ended. On failure the model stays empty.
    Finished {
        path: PathBuf,
        success: bool,
        error: Option<Arc<Error>>,
    },
}

impl LoadEvent {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Started { path } | Self::Finished { path, .. } => path,
        }
    }
}

/// What [`LoadController::load`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    /// A background load was started.
    Started,
    /// The path equals the last requested one; nothing was done.
    SameFile,
    /// Another load is in flight; the request was dropped.
    Busy,
}

/// Whether a load is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

/// State shared with the background task.
#[derive(Debug, Default)]
struct Shared {
    model: RwLock<Arc<SceneModel>>,
    loading: AtomicBool,
    cancelled: AtomicBool,
    /// Held while `loading` flips together with its Started/Finished event.
    transition: Mutex<()>,
}

/// Single-flight asynchronous loader owning the current [`SceneModel`].
///
/// Must not be dropped from inside an async context: the drop blocks on the
/// outstanding load.
pub struct LoadController<S: ContainerSource = FileSource> {
    source: Arc<S>,
    config: LoaderConfig,
    shared: Arc<Shared>,
    runtime: Runtime,
    tasks: Vec<JoinHandle<()>>,
    last_requested: Option<PathBuf>,
    events_tx: Sender<LoadEvent>,
    events_rx: Receiver<LoadEvent>,
}

impl LoadController<FileSource> {
    /// Create a controller that reads containers from the filesystem.
    pub fn new(config: LoaderConfig) -> Result<Self> {
        Self::with_source(FileSource, config)
    }
}

impl<S: ContainerSource> LoadController<S> {
    /// Create a controller reading containers from `source`.
    pub fn with_source(source: S, config: LoaderConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("onefile-loader")
            .build()
            .map_err(Error::Runtime)?;
        let (events_tx, events_rx) = async_channel::unbounded();

        Ok(Self {
            source: Arc::new(source),
            config,
            shared: Arc::default(),
            runtime,
            tasks: Vec::new(),
            last_requested: None,
            events_tx,
            events_rx,
        })
    }

    /// Request a load of `path`.
    ///
    /// A path equal to the last requested one is skipped, whatever that
    /// request's outcome or the file's current contents. A different path is
    /// rejected while another load is in flight, but still becomes the last
    /// requested path.
    pub fn load(&mut self, path: impl AsRef<Path>) -> LoadRequest {
        let path = path.as_ref();
        if self.last_requested.as_deref() == Some(path) {
            tracing::debug!("Same file already requested, skipping: {}", path.display());
            return LoadRequest::SameFile;
        }
        self.last_requested = Some(path.to_path_buf());
        self.start(path)
    }

    /// Request a load of `path` even if it was the last requested one.
    ///
    /// Still rejected while another load is in flight.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> LoadRequest {
        self.start(path.as_ref())
    }

    fn start(&mut self, path: &Path) -> LoadRequest {
        let shared = Arc::clone(&self.shared);
        let _transition = shared.transition.lock();
        if shared.loading.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "Rejected load of {}: another load is in flight",
                path.display()
            );
            return LoadRequest::Busy;
        }

        self.last_requested = Some(path.to_path_buf());
        self.tasks.retain(|task| !task.is_finished());
        *shared.model.write() = Arc::new(SceneModel::default());

        // Unbounded with a live receiver; cannot fail.
        let _ = self.events_tx.try_send(LoadEvent::Started {
            path: path.to_path_buf(),
        });
        tracing::info!("Started loading {}", path.display());

        let source = Arc::clone(&self.source);
        let task_shared = Arc::clone(&shared);
        let tx = self.events_tx.clone();
        let options = self.config.decode;
        let path = path.to_path_buf();
        let task = self
            .runtime
            .spawn_blocking(move || run_load(source.as_ref(), &path, &options, &task_shared, &tx));
        self.tasks.push(task);

        LoadRequest::Started
    }

    /// Receiver for lifecycle events.
    ///
    /// Receivers share one queue: each event is delivered to exactly one of
    /// them, so a host with several consumers must fan events out itself.
    /// The queue is unbounded and events stay in it until received.
    #[must_use]
    pub fn events(&self) -> Receiver<LoadEvent> {
        self.events_rx.clone()
    }

    /// Snapshot of the current model.
    ///
    /// Empty while a load is in flight and after a failed load.
    #[must_use]
    pub fn model(&self) -> Arc<SceneModel> {
        Arc::clone(&self.shared.model.read())
    }

    #[must_use]
    pub fn state(&self) -> LoadState {
        if self.shared.loading.load(Ordering::Acquire) {
            LoadState::Loading
        } else {
            LoadState::Idle
        }
    }

    /// The path of the last accepted request.
    #[must_use]
    pub fn last_requested(&self) -> Option<&Path> {
        self.last_requested.as_deref()
    }
}

impl<S: ContainerSource> Drop for LoadController<S> {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        for task in self.tasks.drain(..) {
            if let Err(e) = self.runtime.block_on(task) {
                tracing::warn!("Load task ended abnormally: {e}");
            }
        }
    }
}

fn run_load<S: ContainerSource>(
    source: &S,
    path: &Path,
    options: &DecodeOptions,
    shared: &Shared,
    tx: &Sender<LoadEvent>,
) {
    let cancelled = || shared.cancelled.load(Ordering::Acquire);
    let result = source
        .open(path)
        .and_then(|reader| SceneModel::decode(reader, options, cancelled));

    let error = match result {
        Ok(model) => {
            tracing::info!(
                "Loaded {}: scene='{}', {} volumes, {} textures",
                path.display(),
                model.scene().name,
                model.volumes().len(),
                model.textures().len()
            );
            *shared.model.write() = Arc::new(model);
            None
        }
        Err(Error::Cancelled) => {
            tracing::debug!("Load of {} cancelled", path.display());
            None
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}", path.display(), e);
            Some(Arc::new(e))
        }
    };

    // No Started may be queued between clearing the flag and Finished.
    let _transition = shared.transition.lock();
    shared.loading.store(false, Ordering::Release);
    if cancelled() {
        return;
    }

    let _ = tx.try_send(LoadEvent::Finished {
        path: path.to_path_buf(),
        success: error.is_none(),
        error,
    });
}
