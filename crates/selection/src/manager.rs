//! Selection state machine.
//!
//! ```text
//! NONE --set_selection(rect)--> RECT --algebra op--> MASK --clear--> NONE
//! ```
//!
//! The rectangle is the fast path for axis-aligned drags; it is rasterized
//! to a mask the first time a per-pixel operation is requested. A MASK never
//! reverts to a RECT.

use std::sync::Arc;

use ps_common::{CanvasSize, PixelRect};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SelectionError;
use crate::mask::Mask;
use crate::morphology::MaskOp;
use crate::worker::{MaskResult, MaskWorker};

/// A selection shape in top-left-relative canvas pixels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SelectionPath {
    Rect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
    },
}

/// Which representation is currently active.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    None,
    Rect,
    Mask,
}

#[derive(Clone, Debug)]
enum SelectionState {
    None,
    Rect(PixelRect),
    Mask(Arc<Mask>),
}

/// Worker jobs whose results build on each other.
#[derive(Copy, Clone, Debug)]
struct JobChain {
    first_job: u64,
    pending: usize,
    /// Manager version the next chained job assumes.
    state_version: u64,
}

/// Owner of the single global selection.
#[derive(Debug)]
pub struct SelectionManager {
    canvas: CanvasSize,
    state: SelectionState,
    version: u64,
    chain: Option<JobChain>,
}

impl SelectionManager {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            state: SelectionState::None,
            version: 0,
            chain: None,
        }
    }

    fn set_state(&mut self, state: SelectionState) {
        self.state = state;
        self.version += 1;
    }

    // --- Queries ---

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Counter bumped on every state change (for overlay redraws).
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn kind(&self) -> SelectionKind {
        kind_of(&self.state)
    }

    /// True for a rectangle with positive area or a mask with any non-zero sample.
    pub fn has_selection(&self) -> bool {
        match &self.state {
            SelectionState::None => false,
            SelectionState::Rect(r) => !r.is_empty(),
            SelectionState::Mask(m) => !m.is_empty(),
        }
    }

    /// The rectangle, while still in RECT state.
    pub fn rect(&self) -> Option<PixelRect> {
        match self.state {
            SelectionState::Rect(r) => Some(r),
            _ => None,
        }
    }

    /// Bounding rectangle of the selection.
    pub fn bounds(&self) -> Option<PixelRect> {
        match &self.state {
            SelectionState::None => None,
            SelectionState::Rect(r) => Some(*r),
            SelectionState::Mask(m) => m.bounds(),
        }
    }

    /// Selection coverage at a canvas pixel (0 outside the selection).
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        match &self.state {
            SelectionState::None => 0,
            SelectionState::Rect(r) => {
                if r.contains(x, y) {
                    255
                } else {
                    0
                }
            }
            SelectionState::Mask(m) => m.coverage(x, y),
        }
    }

    /// Shared mask for readers (compositor overlay, extraction tools).
    ///
    /// A rectangle is rasterized for the snapshot without changing state.
    pub fn mask_snapshot(&self) -> Option<Arc<Mask>> {
        match &self.state {
            SelectionState::None => None,
            SelectionState::Rect(r) => Some(Arc::new(Mask::from_rect(self.canvas, *r))),
            SelectionState::Mask(m) => Some(Arc::clone(m)),
        }
    }

    // --- State changes ---

    /// Replace the selection. Rectangles are clamped to the canvas; an empty
    /// result leaves no selection. Ellipses are rasterized to a mask.
    pub fn set_selection(&mut self, path: SelectionPath) {
        let state = match path {
            SelectionPath::Rect {
                x,
                y,
                width,
                height,
            } => PixelRect::new(x, y, width, height)
                .intersect(&self.canvas.rect())
                .filter(|r| !r.is_empty())
                .map_or(SelectionState::None, SelectionState::Rect),
            SelectionPath::Ellipse { cx, cy, rx, ry } => {
                let mask = Mask::from_ellipse(self.canvas, cx, cy, rx, ry);
                if mask.is_empty() {
                    SelectionState::None
                } else {
                    SelectionState::Mask(Arc::new(mask))
                }
            }
        };
        debug!(?path, kind = ?kind_of(&state), "Selection set");
        self.set_state(state);
    }

    /// Select the whole canvas.
    pub fn select_all(&mut self) {
        let canvas = self.canvas.rect();
        self.set_selection(SelectionPath::Rect {
            x: canvas.x,
            y: canvas.y,
            width: canvas.width,
            height: canvas.height,
        });
    }

    /// Install a prebuilt mask covering the canvas.
    pub fn set_mask(&mut self, mask: Mask) -> Result<(), SelectionError> {
        if mask.canvas() != self.canvas {
            return Err(SelectionError::SizeMismatch {
                width: mask.width(),
                height: mask.height(),
                canvas: self.canvas,
            });
        }
        self.set_state(SelectionState::Mask(Arc::new(mask)));
        Ok(())
    }

    /// Drop all selection state.
    pub fn clear(&mut self) {
        if !matches!(self.state, SelectionState::None) {
            debug!("Selection cleared");
            self.set_state(SelectionState::None);
        }
    }

    // --- Mask algebra ---

    /// The mask an op should run on, or `None` when the op is a no-op.
    fn op_input(&self, op: MaskOp) -> Option<Arc<Mask>> {
        match (&self.state, op) {
            (SelectionState::None, MaskOp::Invert) => Some(Arc::new(Mask::empty(self.canvas))),
            (SelectionState::None, _) => None,
            _ => self.mask_snapshot(),
        }
    }

    /// Apply a per-pixel operation synchronously. The selection ends in MASK
    /// state. With no selection, only `Invert` has an effect (selecting all).
    pub fn apply(&mut self, op: MaskOp) {
        let Some(input) = self.op_input(op) else {
            debug!(op = op.name(), "No selection, op skipped");
            return;
        };
        let output = op.apply(&input);
        debug!(op = op.name(), version = output.version(), "Mask op applied");
        self.set_state(SelectionState::Mask(Arc::new(output)));
    }

    pub fn invert(&mut self) {
        self.apply(MaskOp::Invert);
    }

    pub fn expand(&mut self, n: u32) {
        self.apply(MaskOp::Expand(n));
    }

    pub fn contract(&mut self, n: u32) {
        self.apply(MaskOp::Contract(n));
    }

    pub fn feather(&mut self, n: u32) {
        self.apply(MaskOp::Feather(n));
    }

    pub fn border(&mut self, n: u32) {
        self.apply(MaskOp::Border(n));
    }

    pub fn smooth(&mut self, n: u32) {
        self.apply(MaskOp::Smooth(n));
    }

    // --- Offload ---

    /// Queue an op on the background worker.
    ///
    /// A rectangle is rasterized into MASK state first so the completed
    /// result can be matched against the current mask version. While earlier
    /// jobs are still pending and the selection has not changed since, the op
    /// is chained onto their output. Returns `Ok(None)` when the op is a no-op.
    pub fn submit(
        &mut self,
        worker: &mut MaskWorker,
        op: MaskOp,
    ) -> Result<Option<u64>, SelectionError> {
        let chained = matches!(
            self.chain,
            Some(chain) if chain.pending > 0 && chain.state_version == self.version
        );
        let id = if chained {
            worker.submit_chained(op)?
        } else {
            let Some(input) = self.op_input(op) else {
                return Ok(None);
            };
            if !matches!(&self.state, SelectionState::Mask(m) if Arc::ptr_eq(m, &input)) {
                self.set_state(SelectionState::Mask(Arc::clone(&input)));
            }
            let id = worker.submit(input, op)?;
            self.chain = Some(JobChain {
                first_job: id,
                pending: 0,
                state_version: self.version,
            });
            id
        };
        if let Some(chain) = &mut self.chain {
            chain.pending += 1;
        }
        debug!(job = id, op = op.name(), chained, "Submitted mask job");
        Ok(Some(id))
    }

    /// Apply a finished worker result if it was computed from the current
    /// mask. Stale results are discarded; returns whether it was applied.
    pub fn apply_completed(&mut self, result: MaskResult) -> bool {
        let in_chain = match &mut self.chain {
            Some(chain) if result.id >= chain.first_job => {
                chain.pending = chain.pending.saturating_sub(1);
                true
            }
            _ => false,
        };
        let current = match &self.state {
            SelectionState::Mask(m) => Some(m.version()),
            _ => None,
        };
        if current != Some(result.input_version) || result.output.canvas() != self.canvas {
            warn!(
                job = result.id,
                op = result.op.name(),
                input_version = result.input_version,
                current_version = ?current,
                "Discarding stale mask result"
            );
            if in_chain {
                self.chain = None;
            }
            return false;
        }
        debug!(job = result.id, op = result.op.name(), "Applying mask result");
        self.set_state(SelectionState::Mask(result.output));
        if in_chain {
            match &mut self.chain {
                Some(chain) if chain.pending > 0 => chain.state_version = self.version,
                _ => self.chain = None,
            }
        }
        true
    }

    // --- Canvas geometry ---

    /// Follow a canvas-size change: content moves by `(dx, dy)` and is
    /// clipped to the new canvas.
    pub fn reframe(&mut self, canvas: CanvasSize, dx: i32, dy: i32) {
        self.canvas = canvas;
        let state = match &self.state {
            SelectionState::None => SelectionState::None,
            SelectionState::Rect(r) => PixelRect::new(r.x + dx, r.y + dy, r.width, r.height)
                .intersect(&canvas.rect())
                .filter(|r| !r.is_empty())
                .map_or(SelectionState::None, SelectionState::Rect),
            SelectionState::Mask(m) => SelectionState::Mask(Arc::new(m.reframe(canvas, dx, dy))),
        };
        self.set_state(state);
    }

    /// Follow an image resize: the selection scales with the content.
    pub fn rescale(&mut self, canvas: CanvasSize) {
        let old = self.canvas;
        self.canvas = canvas;
        let state = match &self.state {
            SelectionState::None => SelectionState::None,
            SelectionState::Rect(r) => {
                let sx = f64::from(canvas.width) / f64::from(old.width.max(1));
                let sy = f64::from(canvas.height) / f64::from(old.height.max(1));
                let x0 = (f64::from(r.x) * sx).round() as i64;
                let y0 = (f64::from(r.y) * sy).round() as i64;
                let x1 = (r.right() as f64 * sx).round() as i64;
                let y1 = (r.bottom() as f64 * sy).round() as i64;
                PixelRect::new(
                    x0 as i32,
                    y0 as i32,
                    (x1 - x0).max(0) as u32,
                    (y1 - y0).max(0) as u32,
                )
                .intersect(&canvas.rect())
                .filter(|r| !r.is_empty())
                .map_or(SelectionState::None, SelectionState::Rect)
            }
            SelectionState::Mask(m) => SelectionState::Mask(Arc::new(m.rescale(canvas))),
        };
        self.set_state(state);
    }

    /// Clear the selection and adopt a new canvas size.
    pub fn reset(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        self.set_state(SelectionState::None);
    }
}

fn kind_of(state: &SelectionState) -> SelectionKind {
    match state {
        SelectionState::None => SelectionKind::None,
        SelectionState::Rect(_) => SelectionKind::Rect,
        SelectionState::Mask(_) => SelectionKind::Mask,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const CANVAS: CanvasSize = CanvasSize::new(64, 48);

    fn rect(x: i32, y: i32, width: u32, height: u32) -> SelectionPath {
        SelectionPath::Rect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn rect_is_clamped_to_canvas() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(-10, 40, 30, 30));
        assert_eq!(sel.kind(), SelectionKind::Rect);
        assert_eq!(sel.rect(), Some(PixelRect::new(0, 40, 20, 8)));
    }

    #[test]
    fn zero_area_rect_is_no_selection() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(5, 5, 0, 10));
        assert!(!sel.has_selection());
        assert_eq!(sel.kind(), SelectionKind::None);

        sel.set_selection(rect(100, 100, 10, 10));
        assert!(!sel.has_selection());
    }

    #[test]
    fn algebra_moves_rect_to_mask() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(10, 10, 10, 10));
        sel.expand(2);
        assert_eq!(sel.kind(), SelectionKind::Mask);
        assert_eq!(sel.bounds(), Some(PixelRect::new(8, 8, 14, 14)));
        sel.contract(2);
        // MASK never reverts to RECT
        assert_eq!(sel.kind(), SelectionKind::Mask);
        assert_eq!(sel.bounds(), Some(PixelRect::new(10, 10, 10, 10)));
    }

    #[test]
    fn invert_without_selection_selects_all() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.invert();
        assert_eq!(sel.kind(), SelectionKind::Mask);
        assert_eq!(sel.bounds(), Some(CANVAS.rect()));
    }

    #[test]
    fn other_ops_without_selection_are_noops() {
        let mut sel = SelectionManager::new(CANVAS);
        let v = sel.version();
        sel.expand(3);
        sel.feather(2);
        sel.border(1);
        sel.smooth(1);
        assert_eq!(sel.kind(), SelectionKind::None);
        assert_eq!(sel.version(), v);
    }

    #[test]
    fn invert_twice_restores_samples() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(SelectionPath::Ellipse {
            cx: 30.0,
            cy: 20.0,
            rx: 12.0,
            ry: 8.0,
        });
        sel.feather(3);
        let before = sel.mask_snapshot().unwrap();
        sel.invert();
        sel.invert();
        let after = sel.mask_snapshot().unwrap();
        assert_eq!(before.as_raw(), after.as_raw());
    }

    #[test]
    fn snapshot_of_rect_keeps_rect_state() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(1, 2, 3, 4));
        let snap = sel.mask_snapshot().unwrap();
        assert_eq!(snap.bounds(), Some(PixelRect::new(1, 2, 3, 4)));
        assert_eq!(sel.kind(), SelectionKind::Rect);
        assert_eq!(sel.coverage(1, 2), 255);
        assert_eq!(sel.coverage(4, 2), 0);
    }

    #[test]
    fn set_mask_checks_size() {
        let mut sel = SelectionManager::new(CANVAS);
        let err = sel
            .set_mask(Mask::full(CanvasSize::new(2, 2)))
            .unwrap_err();
        assert!(matches!(err, SelectionError::SizeMismatch { .. }));
        assert!(!sel.has_selection());
    }

    #[test]
    fn reframe_and_rescale_follow_canvas() {
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(10, 10, 8, 8));
        sel.reframe(CanvasSize::new(80, 60), 8, 6);
        assert_eq!(sel.rect(), Some(PixelRect::new(18, 16, 8, 8)));
        sel.rescale(CanvasSize::new(160, 120));
        assert_eq!(sel.rect(), Some(PixelRect::new(36, 32, 16, 16)));
        assert_eq!(sel.canvas(), CanvasSize::new(160, 120));
    }

    #[test]
    fn worker_results_apply_unless_stale() {
        let mut worker = MaskWorker::spawn().unwrap();
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(10, 10, 10, 10));

        sel.submit(&mut worker, MaskOp::Expand(1)).unwrap();
        let result = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(sel.apply_completed(result));
        assert_eq!(sel.bounds(), Some(PixelRect::new(9, 9, 12, 12)));

        // The selection changes while the job is in flight.
        sel.submit(&mut worker, MaskOp::Invert).unwrap();
        sel.set_selection(rect(0, 0, 4, 4));
        let stale = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!sel.apply_completed(stale));
        assert_eq!(sel.rect(), Some(PixelRect::new(0, 0, 4, 4)));
    }

    #[test]
    fn queued_jobs_compose() {
        let mut worker = MaskWorker::spawn().unwrap();
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(20, 20, 10, 10));

        sel.submit(&mut worker, MaskOp::Expand(2)).unwrap();
        sel.submit(&mut worker, MaskOp::Expand(3)).unwrap();

        let mut applied = 0;
        for _ in 0..2 {
            let result = worker.recv_timeout(Duration::from_secs(5)).unwrap();
            applied += usize::from(sel.apply_completed(result));
        }
        assert_eq!(applied, 2);
        assert_eq!(sel.bounds(), Some(PixelRect::new(15, 15, 20, 20)));

        // A later submit starts from the settled mask.
        sel.submit(&mut worker, MaskOp::Contract(5)).unwrap();
        let result = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(sel.apply_completed(result));
        assert_eq!(sel.bounds(), Some(PixelRect::new(20, 20, 10, 10)));
    }

    #[test]
    fn edit_between_submits_breaks_the_chain() {
        let mut worker = MaskWorker::spawn().unwrap();
        let mut sel = SelectionManager::new(CANVAS);
        sel.set_selection(rect(20, 20, 10, 10));

        sel.submit(&mut worker, MaskOp::Expand(2)).unwrap();
        sel.set_selection(rect(0, 0, 4, 4));
        sel.submit(&mut worker, MaskOp::Expand(1)).unwrap();

        let stale = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!sel.apply_completed(stale));
        let fresh = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(sel.apply_completed(fresh));
        assert_eq!(sel.bounds(), Some(PixelRect::new(0, 0, 5, 5)));
    }

    #[test]
    fn path_serializes_tagged() {
        let json = serde_json::to_string(&rect(1, 2, 3, 4)).unwrap();
        assert_eq!(json, r#"{"type":"rect","x":1,"y":2,"width":3,"height":4}"#);
    }
}
