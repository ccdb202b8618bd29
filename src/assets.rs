use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
};

use crate::model::ModelAsset;
use crate::session::SessionToken;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{} contains no scene", .path.display())]
    EmptyScene { path: PathBuf },
    #[error("mesh '{mesh}' in {} has no primitives", .path.display())]
    EmptyMesh { path: PathBuf, mesh: String },
    #[error("mesh '{mesh}' in {} has no vertex positions", .path.display())]
    MissingPositions { path: PathBuf, mesh: String },
    #[error("unsupported primitive mode {mode} in {}", .path.display())]
    UnsupportedPrimitive { path: PathBuf, mode: String },
    #[error("{} could not be loaded: {reason}", .path.display())]
    Unavailable { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Socket,
    Plug,
}

/// Anything that can turn a model path into a loaded model. Runs off the frame thread.
pub trait AssetSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError>;
}

/// Loads glTF files relative to an asset root directory.
pub struct GltfSource {
    root: PathBuf,
}

impl GltfSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for GltfSource {
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError> {
        let full_path = self.root.join(path);

        if !full_path.is_file() {
            return Err(AssetError::Unavailable {
                path: full_path,
                reason: "no such file".to_string(),
            });
        }

        ModelAsset::import(&full_path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub token: SessionToken,
    pub kind: AssetKind,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct LoadResult {
    pub token: SessionToken,
    pub kind: AssetKind,
    pub result: Result<ModelAsset, AssetError>,
}

/// Runs loads on the rayon pool and hands results back to the frame thread.
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    in_flight: usize,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        let (sender, receiver) = channel();

        Self {
            source,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn request(&mut self, request: LoadRequest) {
        log::info!(
            "Loading {:?} from {} (session {})",
            request.kind,
            request.path.display(),
            request.token
        );

        let source = self.source.clone();
        let sender = self.sender.clone();
        self.in_flight += 1;

        rayon::spawn(move || {
            let result = source.load(&request.path);
            // Only fails once the loader itself is gone.
            let _ = sender.send(LoadResult {
                token: request.token,
                kind: request.kind,
                result,
            });
        });
    }

    /// Results that have arrived since the last call, without blocking.
    pub fn drain(&mut self) -> Vec<LoadResult> {
        let results: Vec<LoadResult> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(results.len());
        results
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Option<LoadResult> {
        let result = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }
}

#[derive(Debug)]
pub enum LoadStatus {
    Loading(AssetKind),
    Ready,
    Failed { kind: AssetKind, error: AssetError },
}

impl LoadStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadStatus::Failed { .. })
    }
}

/// Sequences the two loads: the plug is only requested after the socket arrived.
#[derive(Debug)]
pub struct LoadChain {
    status: LoadStatus,
}

impl LoadChain {
    /// Starts the chain and returns the first asset to fetch.
    pub fn start() -> (Self, AssetKind) {
        (
            Self {
                status: LoadStatus::Loading(AssetKind::Socket),
            },
            AssetKind::Socket,
        )
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Records a successful load and returns the next asset to fetch, if any.
    ///
    /// Results for a step the chain is not waiting on are ignored.
    pub fn on_loaded(&mut self, kind: AssetKind) -> Option<AssetKind> {
        match (&self.status, kind) {
            (LoadStatus::Loading(AssetKind::Socket), AssetKind::Socket) => {
                self.status = LoadStatus::Loading(AssetKind::Plug);
                Some(AssetKind::Plug)
            }
            (LoadStatus::Loading(AssetKind::Plug), AssetKind::Plug) => {
                self.status = LoadStatus::Ready;
                None
            }
            _ => None,
        }
    }

    pub fn expects(&self, kind: AssetKind) -> bool {
        matches!(&self.status, LoadStatus::Loading(waiting) if *waiting == kind)
    }

    pub fn on_failed(&mut self, kind: AssetKind, error: AssetError) {
        if self.expects(kind) {
            self.status = LoadStatus::Failed { kind, error };
        }
    }

    /// Re-issues the step that failed. Returns the asset to fetch again.
    pub fn retry(&mut self) -> Option<AssetKind> {
        let LoadStatus::Failed { kind, .. } = self.status else {
            return None;
        };

        self.status = LoadStatus::Loading(kind);
        Some(kind)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::model::{Model, ModelPrimitive, NodeAsset};

    pub fn cube_asset(name: &str) -> ModelAsset {
        let mut node = NodeAsset::group(name, Vec::new());
        node.mesh = Some(Model {
            name: format!("{name} mesh"),
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices: Vec::new(),
                indices: Vec::new(),
            }],
        });

        ModelAsset {
            root: NodeAsset::group("Scene", vec![node]),
        }
    }

    /// Records every path asked for and fails the ones listed in `failing`.
    #[derive(Default)]
    pub struct RecordingSource {
        pub requested: Mutex<Vec<PathBuf>>,
        pub failing: Mutex<Vec<PathBuf>>,
    }

    impl RecordingSource {
        pub fn requested(&self) -> Vec<PathBuf> {
            self.requested.lock().unwrap().clone()
        }

        pub fn fail(&self, path: impl Into<PathBuf>) {
            self.failing.lock().unwrap().push(path.into());
        }

        pub fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }
    }

    impl AssetSource for RecordingSource {
        fn load(&self, path: &Path) -> Result<ModelAsset, AssetError> {
            self.requested.lock().unwrap().push(path.to_path_buf());

            if self.failing.lock().unwrap().iter().any(|p| p == path) {
                return Err(AssetError::Unavailable {
                    path: path.to_path_buf(),
                    reason: "refused by test source".to_string(),
                });
            }

            Ok(cube_asset(&path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::RecordingSource;
    use super::*;

    fn unavailable() -> AssetError {
        AssetError::Unavailable {
            path: PathBuf::from("x"),
            reason: "gone".to_string(),
        }
    }

    #[test]
    fn chain_requests_plug_only_after_socket() {
        let (mut chain, first) = LoadChain::start();
        assert_eq!(first, AssetKind::Socket);

        assert_eq!(chain.on_loaded(AssetKind::Plug), None);
        assert!(chain.expects(AssetKind::Socket));

        assert_eq!(chain.on_loaded(AssetKind::Socket), Some(AssetKind::Plug));
        assert_eq!(chain.on_loaded(AssetKind::Plug), None);
        assert!(matches!(chain.status(), LoadStatus::Ready));
    }

    #[test]
    fn failed_step_can_be_retried() {
        let (mut chain, _) = LoadChain::start();
        chain.on_loaded(AssetKind::Socket);
        chain.on_failed(AssetKind::Plug, unavailable());

        assert!(chain.status().is_failed());
        assert_eq!(chain.retry(), Some(AssetKind::Plug));
        assert!(chain.expects(AssetKind::Plug));
        assert_eq!(chain.retry(), None);
    }

    #[test]
    fn failures_for_other_steps_are_ignored() {
        let (mut chain, _) = LoadChain::start();
        chain.on_failed(AssetKind::Plug, unavailable());
        assert!(chain.expects(AssetKind::Socket));
    }

    #[test]
    fn loader_delivers_results_tagged_with_their_session() {
        let source = Arc::new(RecordingSource::default());
        source.fail("broken.gltf");
        let mut loader = AssetLoader::new(source.clone());

        loader.request(LoadRequest {
            token: SessionToken(7),
            kind: AssetKind::Socket,
            path: PathBuf::from("socket.gltf"),
        });
        assert_eq!(loader.in_flight(), 1);

        let result = loader.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(result.token, SessionToken(7));
        assert_eq!(result.kind, AssetKind::Socket);
        assert!(result.result.is_ok());
        assert_eq!(loader.in_flight(), 0);

        loader.request(LoadRequest {
            token: SessionToken(7),
            kind: AssetKind::Plug,
            path: PathBuf::from("broken.gltf"),
        });
        let result = loader.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            result.result,
            Err(AssetError::Unavailable { .. })
        ));

        assert_eq!(
            source.requested(),
            [PathBuf::from("socket.gltf"), PathBuf::from("broken.gltf")]
        );
    }

    #[test]
    fn missing_file_is_reported_as_unavailable() {
        let source = GltfSource::new("/nonexistent-plugout-assets");
        let error = source.load(Path::new("model.gltf")).unwrap_err();
        assert!(matches!(
            error,
            AssetError::Unavailable { ref path, .. }
                if path == Path::new("/nonexistent-plugout-assets/model.gltf")
        ));
    }
}
