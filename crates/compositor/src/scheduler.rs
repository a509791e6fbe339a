//! Cooperative render scheduling.
//!
//! The host calls [`RenderScheduler::tick`] from its event loop. A frame is
//! rendered when the scene is dirty (stack revision or selection version
//! changed, or a redraw was requested) or, while something on screen moves,
//! once per frame interval. Otherwise the tick yields without rendering.
//!
//! The running flag is shared (`Arc<AtomicBool>`) so UI collaborators on
//! other threads can observe or stop the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ps_common::{RenderConfig, TimeCode};
use ps_layers::LayerStack;
use ps_selection::{Mask, SelectionManager};
use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::CompositorError;

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Nothing changed and nothing animates.
    Idle,
    /// The scheduler is stopped.
    Stopped,
}

pub struct RenderScheduler {
    running: Arc<AtomicBool>,
    frame_interval: f64,
    redraw_requested: bool,
    rendered_revision: Option<u64>,
    rendered_selection: Option<u64>,
    last_frame_at: Option<TimeCode>,
    /// Mask snapshot per selection version.
    snapshot: Option<(u64, Option<Arc<Mask>>)>,
}

impl RenderScheduler {
    /// A stopped scheduler paced by `config.target_fps`.
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            frame_interval: config.frame_interval_secs(),
            redraw_requested: true,
            rendered_revision: None,
            rendered_selection: None,
            last_frame_at: None,
            snapshot: None,
        }
    }

    pub fn start(&mut self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            self.redraw_requested = true;
            info!(interval = self.frame_interval, "Render scheduler started");
        }
    }

    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Render scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared handle to the running flag.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Force a frame on the next tick.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Whether the scene changed since the last rendered frame.
    pub fn is_dirty(&self, stack: &LayerStack, selection: &SelectionManager) -> bool {
        self.redraw_requested
            || self.rendered_revision != Some(stack.revision())
            || self.rendered_selection != Some(selection.version())
    }

    fn frame_due(&self, now: TimeCode) -> bool {
        match self.last_frame_at {
            None => true,
            // A backwards jump (seek) is always due.
            Some(last) => now < last || (now - last).as_secs() >= self.frame_interval,
        }
    }

    /// The selection as a mask, rasterized once per selection version.
    pub fn mask_for(&mut self, selection: &SelectionManager) -> Option<Arc<Mask>> {
        let version = selection.version();
        match &self.snapshot {
            Some((v, mask)) if *v == version => mask.clone(),
            _ => {
                let mask = selection.mask_snapshot();
                self.snapshot = Some((version, mask.clone()));
                mask
            }
        }
    }

    /// Render a frame at playback time `now` if one is needed.
    pub fn tick(
        &mut self,
        now: TimeCode,
        compositor: &mut Compositor,
        stack: &LayerStack,
        selection: &SelectionManager,
    ) -> Result<TickOutcome, CompositorError> {
        if !self.is_running() {
            return Ok(TickOutcome::Stopped);
        }
        let dirty = self.is_dirty(stack, selection);
        let continuous = compositor.needs_continuous(stack, selection.has_selection());
        if !dirty && !(continuous && self.frame_due(now)) {
            return Ok(TickOutcome::Idle);
        }

        let mask = self.mask_for(selection);
        compositor.render_frame(stack, mask.as_deref(), now)?;

        self.redraw_requested = false;
        self.rendered_revision = Some(stack.revision());
        self.rendered_selection = Some(selection.version());
        self.last_frame_at = Some(now);
        debug!(time = %now, dirty, continuous, "Scheduled frame rendered");
        Ok(TickOutcome::Rendered)
    }
}
