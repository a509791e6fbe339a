//! The editor document: one layer stack, one selection, one compositor.
//!
//! `Document` owns every piece of editor state and exposes the public
//! operations. Handlers that need several pieces at once (geometry, paste,
//! flatten, the extraction tools) receive a [`ToolContext`] borrowed from it
//! via [`Document::tools`].
//!
//! ```text
//! Document
//! ├── stack: LayerStack            (source of truth, notifies compositor)
//! ├── selection: SelectionManager  (mask / rect state machine)
//! ├── compositor: Compositor       (frames, program cache, overlay)
//! ├── scheduler: RenderScheduler   (when to render)
//! └── worker: Option<MaskWorker>   (offloaded morphology)
//! ```

use std::sync::Arc;
use std::time::Duration;

use ps_common::{
    raster, Anchor, EditorConfig, EffectId, LayerId, ParamMap, ParamValue, RgbaImage, TimeCode,
};
use ps_compositor::{Compositor, GpuBackend, RenderScheduler, SoftwareBackend, TickOutcome};
use ps_effects::EffectRegistry;
use ps_layers::{Layer, LayerInfo, LayerStack, MediaSource, StackError};
use ps_selection::{MaskOp, MaskWorker, SelectionManager, SelectionPath};
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardSource;
use crate::context::{check_canvas, ToolContext};
use crate::error::EditorError;
use crate::project::BaseLayer;
use crate::{flatten, geometry, paste};

pub struct Document {
    config: EditorConfig,
    stack: LayerStack,
    selection: SelectionManager,
    compositor: Compositor,
    scheduler: RenderScheduler,
    registry: Arc<EffectRegistry>,
    worker: Option<MaskWorker>,
    playhead: TimeCode,
}

impl Document {
    /// An empty document on the configured default canvas, rendering with
    /// the software backend and the built-in effects.
    ///
    /// The stack starts empty; seed it with [`reset`](Self::reset).
    pub fn new(config: EditorConfig) -> Self {
        let registry = Arc::new(EffectRegistry::with_builtins());
        let backend = SoftwareBackend::new(Arc::clone(&registry))
            .with_max_dimension(config.max_canvas_dimension);
        Self::with_backend(config, registry, Box::new(backend))
    }

    pub fn with_backend(
        config: EditorConfig,
        registry: Arc<EffectRegistry>,
        backend: Box<dyn GpuBackend>,
    ) -> Self {
        let canvas = config.default_canvas;
        let mut stack = LayerStack::new(canvas);
        let mut compositor = Compositor::new(backend, config.render.overlay.clone());
        compositor.attach(&mut stack);
        let scheduler = RenderScheduler::new(&config.render);
        Self {
            selection: SelectionManager::new(canvas),
            stack,
            compositor,
            scheduler,
            registry,
            worker: None,
            playhead: TimeCode::ZERO,
            config,
        }
    }

    /// A document on the default canvas seeded with `base`.
    pub fn with_base(config: EditorConfig, base: BaseLayer) -> Result<Self, EditorError> {
        let canvas = config.default_canvas;
        let mut doc = Self::new(config);
        doc.reset(canvas.width, canvas.height, base)?;
        Ok(doc)
    }

    // --- Accessors ---

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut RenderScheduler {
        &mut self.scheduler
    }

    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.registry
    }

    pub fn playhead(&self) -> TimeCode {
        self.playhead
    }

    pub fn set_playhead(&mut self, time: TimeCode) {
        self.playhead = time;
    }

    /// Layer metadata bottom-to-top, for list rendering.
    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.stack.iter().map(Layer::info).collect()
    }

    /// Borrow the editing state for a tool or geometry handler.
    pub fn tools(&mut self) -> ToolContext<'_> {
        ToolContext {
            stack: &mut self.stack,
            selection: &mut self.selection,
            compositor: &mut self.compositor,
            config: &self.config,
            time: self.playhead,
        }
    }

    // --- Project ---

    /// Start over on a `width x height` canvas with a single base layer.
    pub fn reset(&mut self, width: u32, height: u32, base: BaseLayer) -> Result<LayerId, EditorError> {
        let canvas = check_canvas(&self.config, width, height)?;
        let layer = base.into_layer(canvas, self.config.names.base.clone());
        self.stack.reset(canvas);
        self.selection.reset(canvas);
        let id = self.stack.push(layer)?;
        self.stack.set_active(Some(id))?;
        self.compositor.request_resize();
        self.scheduler.request_redraw();
        info!(canvas = %canvas, base = %id, "Document reset");
        Ok(id)
    }

    // --- Layers ---

    /// Decode an encoded still and push it on top as the active layer.
    pub fn open_media(&mut self, name: &str, bytes: &[u8]) -> Result<LayerId, EditorError> {
        let image = raster::decode(bytes)?;
        self.add_media(name, MediaSource::Still(image))
    }

    /// Push media on top, centered, as the active layer.
    pub fn add_media(&mut self, name: &str, media: MediaSource) -> Result<LayerId, EditorError> {
        let id = self.stack.push(Layer::media(name, media))?;
        self.stack.set_active(Some(id))?;
        Ok(id)
    }

    /// Push an effect layer on top.
    ///
    /// Parameters are validated when the effect is known to the registry; an
    /// unknown effect is accepted and renders as pass-through.
    pub fn add_effect(
        &mut self,
        name: &str,
        effect_id: EffectId,
        params: ParamMap,
    ) -> Result<LayerId, EditorError> {
        if self.registry.contains(effect_id.as_str()) {
            self.registry.validate(effect_id.as_str(), &params)?;
        } else {
            warn!(effect = %effect_id, "Unknown effect, layer will pass through");
        }
        let id = self.stack.push(Layer::effect(name, effect_id, params))?;
        self.stack.set_active(Some(id))?;
        Ok(id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<Layer, EditorError> {
        Ok(self.stack.remove(id)?)
    }

    pub fn reorder_layer(&mut self, id: LayerId, before_id: LayerId) -> Result<(), EditorError> {
        Ok(self.stack.reorder(id, before_id)?)
    }

    pub fn set_active_layer(&mut self, id: Option<LayerId>) -> Result<(), EditorError> {
        Ok(self.stack.set_active(id)?)
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> Result<(), EditorError> {
        Ok(self.stack.set_visible(id, visible)?)
    }

    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> Result<(), EditorError> {
        Ok(self.stack.set_opacity(id, opacity)?)
    }

    pub fn set_layer_offset(&mut self, id: LayerId, offset_x: i32, offset_y: i32) -> Result<(), EditorError> {
        Ok(self.stack.set_offset(id, offset_x, offset_y)?)
    }

    /// Set one parameter of an effect layer, validated like [`add_effect`](Self::add_effect).
    pub fn set_effect_param(
        &mut self,
        id: LayerId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), EditorError> {
        let layer = self.stack.get(id).ok_or(StackError::NotFound(id))?;
        if let Some(fx) = layer.as_effect() {
            let effect = fx.effect_id.as_str();
            if self.registry.contains(effect) {
                let mut single = ParamMap::new();
                single.insert(name.to_string(), value.clone());
                self.registry.validate(effect, &single)?;
            }
        }
        Ok(self.stack.set_param(id, name, value)?)
    }

    // --- Geometry ---

    pub fn resize_image(&mut self, width: u32, height: u32) -> Result<(), EditorError> {
        geometry::resize_image(&mut self.tools(), width, height)
    }

    pub fn change_canvas_size(
        &mut self,
        width: u32,
        height: u32,
        anchor: Anchor,
    ) -> Result<(), EditorError> {
        geometry::change_canvas_size(&mut self.tools(), width, height, anchor)
    }

    pub fn crop_to_selection(&mut self) -> Result<(), EditorError> {
        geometry::crop_to_selection(&mut self.tools())
    }

    // --- Selection ---

    pub fn set_selection(&mut self, path: SelectionPath) {
        self.selection.set_selection(path);
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    pub fn select_none(&mut self) {
        self.selection.clear();
    }

    /// Run a mask operation, on the worker when one is running and the
    /// canvas is large enough. Returns the job id when offloaded.
    pub fn apply_mask_op(&mut self, op: MaskOp) -> Result<Option<u64>, EditorError> {
        let pixels = self.stack.canvas().pixel_count() as u64;
        match self.worker.as_mut() {
            Some(worker) if pixels >= self.config.selection.offload_threshold_pixels => {
                let job = self.selection.submit(worker, op)?;
                debug!(op = op.name(), job = ?job, "Mask op offloaded");
                Ok(job)
            }
            _ => {
                self.selection.apply(op);
                Ok(None)
            }
        }
    }

    pub fn start_mask_worker(&mut self) -> Result<(), EditorError> {
        if self.worker.is_none() {
            self.worker = Some(MaskWorker::spawn()?);
        }
        Ok(())
    }

    pub fn stop_mask_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }

    /// Apply every finished worker result. Returns how many were applied.
    pub fn poll_mask_worker(&mut self) -> usize {
        let Some(worker) = &self.worker else {
            return 0;
        };
        let mut applied = 0;
        while let Some(result) = worker.try_recv() {
            if self.selection.apply_completed(result) {
                applied += 1;
            }
        }
        applied
    }

    /// Block up to `timeout` for one worker result, then drain the rest.
    pub fn wait_mask_worker(&mut self, timeout: Duration) -> usize {
        let Some(worker) = &self.worker else {
            return 0;
        };
        let Some(first) = worker.recv_timeout(timeout) else {
            return 0;
        };
        let applied = usize::from(self.selection.apply_completed(first));
        applied + self.poll_mask_worker()
    }

    // --- Clipboard / flatten ---

    pub fn paste(&mut self, clipboard: &mut dyn ClipboardSource) -> Result<LayerId, EditorError> {
        paste::paste(&mut self.tools(), clipboard)
    }

    pub fn flatten_selected(&mut self, ids: &[LayerId]) -> Result<LayerId, EditorError> {
        flatten::flatten_selected(&mut self.tools(), ids)
    }

    pub fn flatten_image(&mut self) -> Result<LayerId, EditorError> {
        flatten::flatten_image(&mut self.tools())
    }

    // --- Rendering ---

    /// Render one frame at `time` immediately.
    pub fn render_frame(&mut self, time: TimeCode) -> Result<&RgbaImage, EditorError> {
        self.playhead = time;
        let mask = self.scheduler.mask_for(&self.selection);
        Ok(self
            .compositor
            .render_frame(&self.stack, mask.as_deref(), time)?)
    }

    /// One cooperative scheduler step at playback time `now`.
    pub fn tick(&mut self, now: TimeCode) -> Result<TickOutcome, EditorError> {
        self.playhead = now;
        Ok(self
            .scheduler
            .tick(now, &mut self.compositor, &self.stack, &self.selection)?)
    }

    /// The last composited frame as PNG.
    pub fn capture_frame(&self) -> Result<Vec<u8>, EditorError> {
        Ok(self.compositor.capture_frame()?)
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}
