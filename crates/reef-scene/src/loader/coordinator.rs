//! Asynchronous load coordinator.
//!
//! File reads run on a rayon pool and report back over a crossbeam channel.
//! Everything that touches the device runs inside [`LoadCoordinator::poll`]
//! (or [`LoadCoordinator::finish_blocking`]) on the caller's thread, one step
//! at a time, so joins never race and each fires exactly once.

use std::fmt;
use std::io;
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

use super::graph::{GraphError, JoinGraph};
use super::manifest::{LoadManifest, LoadNode};
use super::source::AssetSource;
use crate::family::{PassFamily, TextureSlot};
use crate::geometry::MeshKind;
use crate::gfx::{DeviceError, ShaderStage};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Ready,
    /// Terminal until [`LoadCoordinator::reset`].
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::NotLoaded => "not loaded",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One unit of device work handed to the caller.
#[derive(Debug)]
pub enum LoadStep<'a> {
    Shader {
        family: PassFamily,
        stage: ShaderStage,
        bytecode: &'a [u8],
    },
    Texture {
        slot: TextureSlot,
        data: &'a [u8],
    },
    Mesh(MeshKind),
    Ready,
}

#[derive(Debug)]
pub enum LoadError {
    Read {
        node: LoadNode,
        file: String,
        source: io::Error,
    },
    Device {
        node: LoadNode,
        source: DeviceError,
    },
    Graph(GraphError),
    WorkerPool(rayon::ThreadPoolBuildError),
    /// `begin` was called while not in `NotLoaded`.
    InvalidState(LoadState),
    /// Every read reported back but the ready gate never fired.
    Disconnected { outstanding: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read { node, file, .. } => write!(f, "failed to read {file} for {node}"),
            LoadError::Device { node, .. } => write!(f, "device rejected {node}"),
            LoadError::Graph(e) => write!(f, "malformed load graph: {e}"),
            LoadError::WorkerPool(_) => f.write_str("failed to start loader worker pool"),
            LoadError::InvalidState(s) => write!(f, "cannot begin loading while {s}"),
            LoadError::Disconnected { outstanding } => {
                write!(f, "load channel closed with {outstanding} reads unaccounted for")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Read { source, .. } => Some(source),
            LoadError::Device { source, .. } => Some(source),
            LoadError::Graph(e) => Some(e),
            LoadError::WorkerPool(e) => Some(e),
            LoadError::InvalidState(_) | LoadError::Disconnected { .. } => None,
        }
    }
}

impl From<GraphError> for LoadError {
    fn from(e: GraphError) -> Self {
        LoadError::Graph(e)
    }
}

struct ReadResult {
    node: LoadNode,
    file: String,
    bytes: io::Result<Vec<u8>>,
}

/// In-flight state of one load run.
struct Run {
    graph: JoinGraph,
    results: Receiver<ReadResult>,
    outstanding: usize,
}

pub struct LoadCoordinator {
    pool: rayon::ThreadPool,
    state: LoadState,
    run: Option<Run>,
}

impl LoadCoordinator {
    /// `worker_threads == 0` lets rayon size the pool.
    pub fn new(worker_threads: usize) -> Result<Self, LoadError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("reef-loader-{i}"))
            .build()
            .map_err(LoadError::WorkerPool)?;

        Ok(Self {
            pool,
            state: LoadState::NotLoaded,
            run: None,
        })
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// Reads issued but not yet processed.
    pub fn pending_reads(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.outstanding)
    }

    /// Starts every read in `manifest`. Only valid from `NotLoaded`.
    pub fn begin(
        &mut self,
        manifest: &LoadManifest,
        source: Arc<dyn AssetSource>,
    ) -> Result<(), LoadError> {
        if self.state != LoadState::NotLoaded {
            return Err(LoadError::InvalidState(self.state));
        }
        let graph = JoinGraph::new(&manifest.joins)?;

        // Each task owns a sender clone; once all have reported and this one is
        // dropped, the receiver observes disconnection.
        let (tx, rx) = crossbeam_channel::unbounded();
        for task in &manifest.reads {
            let tx = tx.clone();
            let source = Arc::clone(&source);
            let node = task.node;
            let file = task.file.clone();
            self.pool.spawn(move || {
                let bytes = source.read(&file);
                if let Ok(b) = &bytes {
                    log::debug!("read {file} ({} bytes)", b.len());
                }
                // Receiver is gone after a reset or failure; the result is stale.
                let _ = tx.send(ReadResult { node, file, bytes });
            });
        }
        drop(tx);

        log::info!(
            "loading {} assets ({} joins)",
            manifest.reads.len(),
            manifest.joins.len()
        );
        self.run = Some(Run {
            graph,
            results: rx,
            outstanding: manifest.reads.len(),
        });
        self.state = LoadState::Loading;
        Ok(())
    }

    /// Processes every read that has finished, without blocking.
    pub fn poll<F>(&mut self, mut apply: F) -> Result<LoadState, LoadError>
    where
        F: FnMut(LoadStep<'_>) -> Result<(), DeviceError>,
    {
        while self.state == LoadState::Loading {
            let next = match &self.run {
                Some(run) => run.results.try_recv(),
                None => break,
            };
            match next {
                Ok(result) => self.process(result, &mut apply)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(self.disconnected()),
            }
        }
        Ok(self.state)
    }

    /// Blocks until loading reaches `Ready` or fails.
    pub fn finish_blocking<F>(&mut self, mut apply: F) -> Result<LoadState, LoadError>
    where
        F: FnMut(LoadStep<'_>) -> Result<(), DeviceError>,
    {
        while self.state == LoadState::Loading {
            let next = match &self.run {
                Some(run) => run.results.recv(),
                None => break,
            };
            match next {
                Ok(result) => self.process(result, &mut apply)?,
                Err(_) => return Err(self.disconnected()),
            }
        }
        Ok(self.state)
    }

    /// Drops any in-flight run and returns to `NotLoaded`.
    ///
    /// Reads still running complete in the background and are discarded.
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take()
            && run.outstanding > 0
        {
            log::debug!("discarding {} in-flight reads", run.outstanding);
        }
        self.state = LoadState::NotLoaded;
    }

    fn disconnected(&mut self) -> LoadError {
        let outstanding = self.pending_reads();
        self.fail();
        LoadError::Disconnected { outstanding }
    }

    fn fail(&mut self) {
        self.state = LoadState::Failed;
        self.run = None;
    }

    fn process<F>(&mut self, result: ReadResult, apply: &mut F) -> Result<(), LoadError>
    where
        F: FnMut(LoadStep<'_>) -> Result<(), DeviceError>,
    {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        run.outstanding = run.outstanding.saturating_sub(1);

        let ReadResult { node, file, bytes } = result;
        let bytes = match bytes {
            Ok(b) => b,
            Err(source) => {
                log::error!("failed to read {file}: {source}");
                self.fail();
                return Err(LoadError::Read { node, file, source });
            }
        };

        let step = match node {
            LoadNode::Shader(family, stage) => LoadStep::Shader {
                family,
                stage,
                bytecode: &bytes,
            },
            LoadNode::Texture(slot) => LoadStep::Texture { slot, data: &bytes },
            LoadNode::Mesh(_) | LoadNode::Ready => {
                log::warn!("read result for join {node} ignored");
                return Ok(());
            }
        };
        if let Err(source) = apply(step) {
            self.fail();
            return Err(LoadError::Device { node, source });
        }
        log::debug!("{node} created");

        self.complete_cascade(node, apply)
    }

    /// Completes `node` and runs every join that becomes ready as a result.
    fn complete_cascade<F>(&mut self, node: LoadNode, apply: &mut F) -> Result<(), LoadError>
    where
        F: FnMut(LoadStep<'_>) -> Result<(), DeviceError>,
    {
        let mut queue = vec![node];
        while let Some(done) = queue.pop() {
            let fired = match self.run.as_mut() {
                Some(run) => run.graph.complete(done),
                None => return Ok(()),
            };

            for join in fired {
                let step = match join {
                    LoadNode::Mesh(kind) => LoadStep::Mesh(kind),
                    LoadNode::Ready => LoadStep::Ready,
                    LoadNode::Shader(..) | LoadNode::Texture(_) => continue,
                };
                if let Err(source) = apply(step) {
                    self.fail();
                    return Err(LoadError::Device { node: join, source });
                }

                if join == LoadNode::Ready {
                    log::info!("all assets loaded");
                    self.state = LoadState::Ready;
                    self.run = None;
                    return Ok(());
                }
                log::debug!("{join} created");
                queue.push(join);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetConfig;
    use crate::loader::source::MemorySource;
    use crate::loader::manifest::{Join, ReadTask};

    fn tiny_manifest() -> LoadManifest {
        let vs = LoadNode::Shader(PassFamily::Underwater, ShaderStage::Vertex);
        let ps = LoadNode::Shader(PassFamily::Underwater, ShaderStage::Pixel);
        let quad = LoadNode::Mesh(MeshKind::FullScreenQuad);
        LoadManifest {
            reads: vec![
                ReadTask { node: vs, file: "vs".to_string() },
                ReadTask { node: ps, file: "ps".to_string() },
            ],
            joins: vec![
                Join { node: quad, after: vec![vs, ps] },
                Join { node: LoadNode::Ready, after: vec![quad] },
            ],
        }
    }

    fn tiny_source() -> Arc<dyn AssetSource> {
        Arc::new(MemorySource::new().with_file("vs", vec![1]).with_file("ps", vec![2]))
    }

    fn step_name(step: &LoadStep<'_>) -> String {
        match step {
            LoadStep::Shader { family, stage, .. } => format!("{family} {stage}"),
            LoadStep::Texture { slot, .. } => slot.to_string(),
            LoadStep::Mesh(kind) => kind.to_string(),
            LoadStep::Ready => "ready".to_string(),
        }
    }

    #[test]
    fn joins_run_after_their_antecedents_and_once() {
        let mut loader = LoadCoordinator::new(2).unwrap();
        loader.begin(&tiny_manifest(), tiny_source()).unwrap();
        assert_eq!(loader.state(), LoadState::Loading);

        let mut steps = Vec::new();
        let state = loader
            .finish_blocking(|s| {
                steps.push(step_name(&s));
                Ok(())
            })
            .unwrap();

        assert_eq!(state, LoadState::Ready);
        assert_eq!(steps.len(), 4);
        assert_eq!(&steps[2..], ["full-screen quad", "ready"]);
        assert_eq!(loader.pending_reads(), 0);
    }

    #[test]
    fn missing_file_fails_the_whole_load() {
        let mut loader = LoadCoordinator::new(1).unwrap();
        let source: Arc<dyn AssetSource> = Arc::new(MemorySource::new().with_file("vs", vec![1]));
        loader.begin(&tiny_manifest(), source).unwrap();

        let mut ready_seen = false;
        let err = loader
            .finish_blocking(|s| {
                ready_seen |= matches!(s, LoadStep::Ready);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, LoadError::Read { ref file, .. } if file == "ps"));
        assert_eq!(loader.state(), LoadState::Failed);
        assert!(!ready_seen);
        assert_eq!(loader.poll(|_| Ok(())).unwrap(), LoadState::Failed);
    }

    #[test]
    fn device_failure_in_a_continuation_is_fatal() {
        let mut loader = LoadCoordinator::new(1).unwrap();
        loader.begin(&tiny_manifest(), tiny_source()).unwrap();

        let err = loader
            .finish_blocking(|s| match s {
                LoadStep::Mesh(_) => Err(DeviceError::Rejected("no memory".to_string())),
                _ => Ok(()),
            })
            .unwrap_err();

        assert!(matches!(
            err,
            LoadError::Device { node: LoadNode::Mesh(MeshKind::FullScreenQuad), .. }
        ));
        assert_eq!(loader.state(), LoadState::Failed);
    }

    #[test]
    fn begin_twice_is_rejected_until_reset() {
        let mut loader = LoadCoordinator::new(1).unwrap();
        loader.begin(&tiny_manifest(), tiny_source()).unwrap();
        assert!(matches!(
            loader.begin(&tiny_manifest(), tiny_source()),
            Err(LoadError::InvalidState(LoadState::Loading))
        ));

        loader.reset();
        assert_eq!(loader.state(), LoadState::NotLoaded);
        loader.begin(&tiny_manifest(), tiny_source()).unwrap();
        assert_eq!(loader.finish_blocking(|_| Ok(())).unwrap(), LoadState::Ready);
    }

    #[test]
    fn unreachable_gate_reports_disconnection() {
        let mut manifest = tiny_manifest();
        // Nothing ever completes this join's second antecedent.
        manifest.joins[1].after.push(LoadNode::Mesh(MeshKind::PlantGrid));

        let mut loader = LoadCoordinator::new(1).unwrap();
        loader.begin(&manifest, tiny_source()).unwrap();
        let err = loader.finish_blocking(|_| Ok(())).unwrap_err();
        assert!(matches!(err, LoadError::Disconnected { outstanding: 0 }));
    }

    #[test]
    fn scene_manifest_loads_from_memory() {
        let assets = AssetConfig::default();
        let manifest = LoadManifest::scene(&assets);
        let mut source = MemorySource::new();
        for read in &manifest.reads {
            source.insert(read.file.clone(), vec![0xFF]);
        }

        let mut loader = LoadCoordinator::new(4).unwrap();
        loader.begin(&manifest, Arc::new(source)).unwrap();
        let mut meshes = 0;
        let state = loader
            .finish_blocking(|s| {
                if matches!(s, LoadStep::Mesh(_)) {
                    meshes += 1;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(state, LoadState::Ready);
        assert_eq!(meshes, MeshKind::ALL.len());
    }
}
