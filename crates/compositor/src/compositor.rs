//! Main compositor: turns the layer stack into a frame.
//!
//! Per frame the [`Compositor`]:
//!
//! 1. Rebuilds its surfaces if a resize is pending or the canvas changed
//!    (only ever here, at a frame boundary).
//! 2. Clears the accumulation surface.
//! 3. Walks the visible layers bottom-to-top. Media layers are blended
//!    source-over at their placement; effect layers run their program over
//!    the accumulated surface (ping-pong) and are mixed back by opacity.
//! 4. Copies the result, draws the marching ants on the copy and presents it.
//!
//! Effect programs are built once per effect id and cached. A program that
//! fails to build turns every layer using it into pass-through. A dispatch
//! failure (bad parameters) degrades only the layer that raised it, until that
//! layer changes. Both are reported once. The cache is dropped whenever the
//! stack structure changes.

use std::collections::{HashMap, HashSet};

use crossbeam::channel::Receiver;
use ps_common::{raster, CanvasSize, EffectId, LayerId, OverlayConfig, RgbaImage, TimeCode};
use ps_layers::{EffectLayer, Layer, LayerSource, LayerStack, StackEvent};
use ps_selection::Mask;
use tracing::{debug, info, warn};

use crate::backend::{GpuBackend, ProgramInfo};
use crate::blend::blend_over;
use crate::overlay::Outline;
use crate::pipeline::RenderPipeline;
use crate::placement::Placement;
use crate::CompositorError;

#[derive(Clone, Copy, Debug)]
enum ProgramState {
    Ready(ProgramInfo),
    Failed,
}

/// Build results per effect id, dispatch failures per layer.
#[derive(Debug, Default)]
struct ProgramCache {
    entries: HashMap<EffectId, ProgramState>,
    failed_layers: HashSet<LayerId>,
}

impl ProgramCache {
    fn get_or_build(
        &mut self,
        backend: &dyn GpuBackend,
        effect: &EffectId,
        layer: LayerId,
    ) -> Option<ProgramInfo> {
        match self.entries.get(effect) {
            Some(ProgramState::Ready(info)) => return Some(*info),
            Some(ProgramState::Failed) => return None,
            None => {}
        }
        match backend.build_program(effect) {
            Ok(info) => {
                self.entries.insert(effect.clone(), ProgramState::Ready(info));
                Some(info)
            }
            Err(err) => {
                warn!(
                    effect = %effect,
                    layer = %layer,
                    error = %err,
                    "Effect program unavailable, layer passes through"
                );
                self.entries.insert(effect.clone(), ProgramState::Failed);
                None
            }
        }
    }

    fn layer_failed(&self, layer: LayerId) -> bool {
        self.failed_layers.contains(&layer)
    }

    fn fail_layer(&mut self, effect: &EffectId, layer: LayerId, err: &ps_common::GpuError) {
        warn!(
            effect = %effect,
            layer = %layer,
            error = %err,
            "Effect dispatch failed, layer passes through"
        );
        self.failed_layers.insert(layer);
    }

    /// Give a changed layer another chance to dispatch.
    fn retry_layer(&mut self, layer: LayerId) {
        if self.failed_layers.remove(&layer) {
            debug!(layer = %layer, "Retrying effect layer after change");
        }
    }

    fn failures(&self) -> usize {
        let builds = self
            .entries
            .values()
            .filter(|s| matches!(s, ProgramState::Failed))
            .count();
        builds + self.failed_layers.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.failed_layers.clear();
    }
}

/// Composites a [`LayerStack`] into presented frames.
pub struct Compositor {
    backend: Box<dyn GpuBackend>,
    programs: ProgramCache,
    pipeline: Option<RenderPipeline>,
    resize_pending: bool,
    events: Option<Receiver<StackEvent>>,
    overlay: OverlayConfig,
    outline: Option<Outline>,
    presented: Option<RgbaImage>,
    frame_count: u64,
}

impl Compositor {
    pub fn new(backend: Box<dyn GpuBackend>, overlay: OverlayConfig) -> Self {
        Self {
            backend,
            programs: ProgramCache::default(),
            pipeline: None,
            resize_pending: false,
            events: None,
            overlay,
            outline: None,
            presented: None,
            frame_count: 0,
        }
    }

    /// Subscribe to `stack` so structure changes invalidate cached programs
    /// and canvas changes schedule a surface rebuild.
    pub fn attach(&mut self, stack: &mut LayerStack) {
        self.events = Some(stack.subscribe());
        self.programs.clear();
    }

    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub fn overlay_config(&self) -> &OverlayConfig {
        &self.overlay
    }

    pub fn set_overlay_config(&mut self, overlay: OverlayConfig) {
        self.overlay = overlay;
    }

    /// Number of frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Size of the current render surfaces, if allocated.
    pub fn surface_size(&self) -> Option<CanvasSize> {
        self.pipeline.as_ref().map(RenderPipeline::size)
    }

    /// Rebuild the surfaces at the start of the next frame.
    pub fn request_resize(&mut self) {
        self.resize_pending = true;
    }

    /// Forget every built program.
    pub fn invalidate_programs(&mut self) {
        self.programs.clear();
    }

    /// Effect programs that failed to build plus layers whose dispatch
    /// failed; each is currently rendered as pass-through.
    pub fn program_failures(&self) -> usize {
        self.programs.failures()
    }

    /// The last presented frame, overlay included.
    pub fn presented(&self) -> Option<&RgbaImage> {
        self.presented.as_ref()
    }

    /// The last composited frame without the overlay.
    pub fn composite(&self) -> Option<&RgbaImage> {
        if self.frame_count == 0 {
            return None;
        }
        self.pipeline.as_ref().map(RenderPipeline::current)
    }

    fn sync_events(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        for event in events.try_iter() {
            match event {
                StackEvent::Structure => self.programs.clear(),
                StackEvent::CanvasResized(canvas) => {
                    debug!(canvas = %canvas, "Surface resize scheduled");
                    self.resize_pending = true;
                }
                StackEvent::LayerChanged(id) => self.programs.retry_layer(id),
                StackEvent::ActiveChanged(_) => {}
            }
        }
    }

    fn surfaces_for(&mut self, canvas: CanvasSize) -> Result<RenderPipeline, CompositorError> {
        match self.pipeline.take() {
            Some(pipeline) if pipeline.size() == canvas && !self.resize_pending => Ok(pipeline),
            previous => {
                info!(
                    from = ?previous.as_ref().map(|p| p.size().to_string()),
                    to = %canvas,
                    "Rebuilding render surfaces"
                );
                self.resize_pending = false;
                RenderPipeline::new(self.backend.as_ref(), canvas)
            }
        }
    }

    /// Render one frame of `stack` at playback `time`.
    ///
    /// `selection` is the active selection mask, if any; its outline is drawn
    /// on the presented frame only.
    pub fn render_frame(
        &mut self,
        stack: &LayerStack,
        selection: Option<&Mask>,
        time: TimeCode,
    ) -> Result<&RgbaImage, CompositorError> {
        self.sync_events();
        let canvas = stack.canvas();
        let mut pipeline = self.surfaces_for(canvas)?;

        composite_layers(
            self.backend.as_ref(),
            &mut self.programs,
            &mut pipeline,
            stack.layers(),
            time,
        );

        let mut frame = pipeline.current().clone();
        self.pipeline = Some(pipeline);

        if let Some(mask) = selection.filter(|m| m.canvas() == canvas) {
            if self.outline.as_ref().map(Outline::version) != Some(mask.version()) {
                self.outline = Some(Outline::trace(mask));
            }
            if let Some(outline) = &self.outline {
                outline.draw(&mut frame, &self.overlay, time);
            }
        }

        self.frame_count += 1;
        debug!(
            frame = self.frame_count,
            layers = stack.len(),
            time = %time,
            "Frame presented"
        );
        Ok(&*self.presented.insert(frame))
    }

    /// Composite `layers` onto a fresh transparent `canvas` without overlay.
    ///
    /// Does not touch the presented frame or the frame counter.
    pub fn compose_layers(
        &mut self,
        layers: &[Layer],
        canvas: CanvasSize,
        time: TimeCode,
    ) -> Result<RgbaImage, CompositorError> {
        self.sync_events();
        let mut pipeline = RenderPipeline::new(self.backend.as_ref(), canvas)?;
        composite_layers(
            self.backend.as_ref(),
            &mut self.programs,
            &mut pipeline,
            layers,
            time,
        );
        Ok(pipeline.take_current())
    }

    /// Encode the last composited frame (no overlay) as PNG.
    pub fn capture_frame(&self) -> Result<Vec<u8>, CompositorError> {
        let frame = self.composite().ok_or(CompositorError::NoFrame)?;
        Ok(raster::encode_png(frame)?)
    }

    /// Whether `stack` needs a new frame every tick: visible animated media,
    /// a visible time-varying effect, or marching ants that march.
    pub fn needs_continuous(&mut self, stack: &LayerStack, selection_active: bool) -> bool {
        if selection_active && self.overlay.animate {
            return true;
        }
        if stack.has_animated_media() {
            return true;
        }
        let backend = self.backend.as_ref();
        let programs = &mut self.programs;
        stack
            .iter()
            .filter(|l| l.visible && l.opacity > 0.0)
            .filter_map(|l| l.as_effect().map(|fx| (l.id, fx)))
            .any(|(id, fx)| {
                programs
                    .get_or_build(backend, &fx.effect_id, id)
                    .is_some_and(|p| p.time_varying)
            })
    }
}

fn composite_layers(
    backend: &dyn GpuBackend,
    programs: &mut ProgramCache,
    pipeline: &mut RenderPipeline,
    layers: &[Layer],
    time: TimeCode,
) {
    pipeline.clear();
    let canvas = pipeline.size();
    for layer in layers.iter().filter(|l| l.visible && l.opacity > 0.0) {
        match &layer.source {
            LayerSource::Media(media) => {
                let frame = media.frame_at(time);
                let Some(placement) =
                    Placement::for_offset(canvas, frame.width(), frame.height(), layer.offset())
                else {
                    continue;
                };
                blend_over(pipeline.current_mut(), frame, &placement, layer.opacity);
            }
            LayerSource::Effect(fx) => {
                run_effect_layer(backend, programs, pipeline, layer, fx, time);
            }
        }
    }
}

fn run_effect_layer(
    backend: &dyn GpuBackend,
    programs: &mut ProgramCache,
    pipeline: &mut RenderPipeline,
    layer: &Layer,
    fx: &EffectLayer,
    time: TimeCode,
) {
    if programs.layer_failed(layer.id) {
        return;
    }
    let Some(program) = programs.get_or_build(backend, &fx.effect_id, layer.id) else {
        return;
    };
    let keep_input = program.passes > 1 || layer.opacity < 1.0;
    if keep_input {
        pipeline.save();
    }
    for pass in 0..program.passes {
        let (input, output) = pipeline.split();
        if let Err(err) = backend.dispatch(&fx.effect_id, pass, input, output, &fx.params, time) {
            programs.fail_layer(&fx.effect_id, layer.id, &err);
            if pass > 0 {
                pipeline.restore();
            }
            return;
        }
        pipeline.swap();
    }
    if layer.opacity < 1.0 {
        pipeline.mix_saved(layer.opacity);
    }
}
