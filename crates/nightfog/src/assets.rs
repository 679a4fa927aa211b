//! Background loading of the scene's OBJ models.
//!
//! [`AssetLoader::spawn`] parses every file on a worker thread and reports
//! each result over a channel. The application waits on the returned
//! [`LoadHandle`] before it starts the render loop.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use nightfog_core::config::ModelConfig;
use nightfog_core::MeshData;

use crate::error::{AppError, Result};

/// One parsed model file, all of its objects merged.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Stable id derived from the file name.
    pub mesh_id: String,
    /// Position in the load list; also the draw order.
    pub index: usize,
    pub mesh: MeshData,
}

/// Parses one OBJ file.
pub fn load_model(path: &Path, index: usize) -> Result<LoadedModel> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options).map_err(|source| {
        AppError::ModelLoad {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut merged = MeshData::default();
    for model in models {
        let mesh = model.mesh;
        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals = (!mesh.normals.is_empty()).then(|| {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        });
        merged.merge(&MeshData::new(positions, normals, mesh.indices));
    }

    let file = path.to_string_lossy();
    Ok(LoadedModel {
        mesh_id: ModelConfig::mesh_id(&file),
        index,
        mesh: merged,
    })
}

/// Starts model loads off the render thread.
pub struct AssetLoader;

impl AssetLoader {
    pub fn spawn(paths: Vec<PathBuf>) -> LoadHandle {
        let expected = paths.len();
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || {
            for (index, path) in paths.iter().enumerate() {
                let result = load_model(path, index);
                if sender.send(result).is_err() {
                    break;
                }
            }
        });
        LoadHandle {
            receiver,
            worker: Some(worker),
            expected,
        }
    }
}

/// Completion handle for a running load.
pub struct LoadHandle {
    receiver: mpsc::Receiver<Result<LoadedModel>>,
    worker: Option<thread::JoinHandle<()>>,
    expected: usize,
}

impl LoadHandle {
    /// Number of files this load was started with.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// The next result if one is ready.
    pub fn try_next(&self) -> Option<Result<LoadedModel>> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until every file is processed. Models that fail to load are
    /// logged and left out.
    pub fn wait(mut self) -> Result<Vec<LoadedModel>> {
        let mut loaded = Vec::with_capacity(self.expected);
        for _ in 0..self.expected {
            match self.receiver.recv() {
                Ok(Ok(model)) => loaded.push(model),
                Ok(Err(e)) => log::warn!("{e}"),
                Err(_) => return Err(AppError::LoaderDisconnected),
            }
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(AppError::LoaderDisconnected);
            }
        }
        log::info!("loaded {} of {} models", loaded.len(), self.expected);
        Ok(loaded)
    }
}
