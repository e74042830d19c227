//! Async map generation system.
//!
//! Offloads [`generate_maps`] to a private, bounded [`rayon`] thread pool so
//! the pixel work does not stall the main thread.  The pool is limited to
//! [`MAX_GENERATION_THREADS`] workers; the row-parallel stages of each run
//! execute on that same pool.  When a task finishes the maps are uploaded to
//! [`Assets<Image>`] and the entity receives the [`MapsReady`] component.
//!
//! # Usage
//! ```rust,ignore
//! // `source` is a decoded RGBA8 PixelBuffer.
//! commands.spawn(PendingMaps::spawn(source, MapOptions::default()));
//!
//! // Later, query for MapsReady to consume the handles.
//! ```

/// Maximum number of worker threads used for map generation.
const MAX_GENERATION_THREADS: usize = 4;

/// Returns the library-private rayon thread pool used for map generation.
///
/// Isolated from the application's global rayon pool so map work does not
/// starve unrelated parallel workloads.
fn gen_pool() -> &'static rayon::ThreadPool {
    static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(MAX_GENERATION_THREADS)
            .thread_name(|i| format!("pbr-map-gen-{i}"))
            .build()
            .expect("failed to build map generation thread pool")
    })
}

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
    mpsc,
};

use bevy::{
    asset::Assets,
    ecs::{
        component::Component,
        entity::Entity,
        system::{Commands, Query, ResMut},
    },
    image::Image,
};

use crate::{
    buffer::PixelBuffer,
    generator::{MapError, MapHandles, map_to_images},
    options::MapOptions,
    pipeline::{MapSet, generate_maps},
};

/// Spawned onto an entity to request background map generation.
///
/// [`poll_map_tasks`] checks for completion each frame with
/// [`mpsc::Receiver::try_recv`].  Dropping `PendingMaps` (e.g. when the
/// entity is despawned) sets an atomic cancellation flag; tasks that have not
/// started yet see it and exit without doing any work.
#[derive(Component)]
pub struct PendingMaps {
    // Wrapped in Mutex so the struct is Sync, which Bevy's Component bound requires.
    rx: std::sync::Mutex<mpsc::Receiver<Result<MapSet, MapError>>>,
    cancelled: Arc<AtomicBool>,
    /// Upload with repeat samplers: the source went through the tiling stage.
    tileable: bool,
}

impl Drop for PendingMaps {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl PendingMaps {
    /// Submit `source` to the generation pool with `options`.
    ///
    /// Takes `source` by value: the task owns its input for its lifetime.
    pub fn spawn(source: PixelBuffer, options: MapOptions) -> Self {
        let tileable = options.tiling_enabled;
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::sync_channel(1);
        gen_pool().spawn(move || {
            if !flag.load(Ordering::Relaxed) {
                tx.send(generate_maps(&source, &options)).ok();
            }
        });
        PendingMaps {
            rx: std::sync::Mutex::new(rx),
            cancelled,
            tileable,
        }
    }

    /// Non-blocking check for a finished result.
    fn try_take(&self) -> Result<Result<MapSet, MapError>, mpsc::TryRecvError> {
        match self.rx.lock() {
            Ok(rx) => rx.try_recv(),
            Err(_) => Err(mpsc::TryRecvError::Disconnected),
        }
    }
}

/// Added to the entity by [`poll_map_tasks`] when generation is complete.
#[derive(Component)]
pub struct MapsReady(pub MapHandles);

/// Bevy system: polls pending generation tasks and uploads finished maps.
pub fn poll_map_tasks(
    mut commands: Commands,
    tasks: Query<(Entity, &PendingMaps)>,
    mut images: ResMut<Assets<Image>>,
) {
    for (entity, pending) in &tasks {
        match pending.try_take() {
            Ok(Ok(maps)) => {
                let handles = map_to_images(maps, pending.tileable, &mut images);
                commands
                    .entity(entity)
                    .remove::<PendingMaps>()
                    .insert(MapsReady(handles));
            }
            Ok(Err(e)) => {
                bevy::log::error!("Map generation failed: {e}");
                commands.entity(entity).remove::<PendingMaps>();
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                bevy::log::error!("Map generation thread panicked");
                commands.entity(entity).remove::<PendingMaps>();
            }
            Err(mpsc::TryRecvError::Empty) => {}
        }
    }
}
