//! Background mask worker.
//!
//! Morphology over a large canvas can take longer than a frame. The worker
//! runs [`MaskOp`]s on its own thread; jobs and results travel over crossbeam
//! channels and the input is an immutable `Arc<Mask>` snapshot, so nothing
//! mutable is shared with the render thread.
//!
//! A [`JobInput::Previous`] job runs on the output of the job queued before
//! it, so ops submitted back to back compose instead of racing.
//!
//! ```text
//! SelectionManager::submit() --MaskJob--> [mask-worker thread]
//!                                              | op.apply(&input)
//! SelectionManager::apply_completed() <--MaskResult--+
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::error::SelectionError;
use crate::mask::Mask;
use crate::morphology::MaskOp;

/// What a job runs on.
#[derive(Debug)]
pub enum JobInput {
    Mask(Arc<Mask>),
    /// The output of the previous job on this worker.
    Previous,
}

/// A unit of background work.
#[derive(Debug)]
pub struct MaskJob {
    pub id: u64,
    pub input: JobInput,
    pub op: MaskOp,
}

/// A finished job. `input_version` identifies the mask the op ran on.
#[derive(Debug)]
pub struct MaskResult {
    pub id: u64,
    pub input_version: u64,
    pub op: MaskOp,
    pub output: Arc<Mask>,
}

/// Handle to the mask worker thread. Dropping it stops the thread.
pub struct MaskWorker {
    jobs: Option<Sender<MaskJob>>,
    results: Receiver<MaskResult>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl MaskWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> Result<Self, SelectionError> {
        let (job_tx, job_rx) = channel::unbounded::<MaskJob>();
        let (result_tx, result_rx) = channel::unbounded::<MaskResult>();

        let handle = std::thread::Builder::new()
            .name("mask-worker".to_string())
            .spawn(move || Self::run(job_rx, result_tx))
            .map_err(|_| SelectionError::WorkerStopped)?;

        info!("Mask worker started");
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
            next_id: 1,
        })
    }

    fn run(jobs: Receiver<MaskJob>, results: Sender<MaskResult>) {
        let mut last: Option<Arc<Mask>> = None;
        for job in jobs {
            let input = match job.input {
                JobInput::Mask(mask) => mask,
                JobInput::Previous => match last.take() {
                    Some(mask) => mask,
                    None => {
                        warn!(job = job.id, "Chained mask job has no predecessor, skipped");
                        continue;
                    }
                },
            };
            debug!(
                job = job.id,
                op = job.op.name(),
                input_version = input.version(),
                "Running mask job"
            );
            let output = Arc::new(job.op.apply(&input));
            last = Some(Arc::clone(&output));
            let result = MaskResult {
                id: job.id,
                input_version: input.version(),
                op: job.op,
                output,
            };
            if results.send(result).is_err() {
                break;
            }
        }
        debug!("Mask worker exiting");
    }

    /// Queue `op` over `input`. Returns the job id.
    pub fn submit(&mut self, input: Arc<Mask>, op: MaskOp) -> Result<u64, SelectionError> {
        self.send(JobInput::Mask(input), op)
    }

    /// Queue `op` over the output of the previously queued job.
    pub fn submit_chained(&mut self, op: MaskOp) -> Result<u64, SelectionError> {
        self.send(JobInput::Previous, op)
    }

    fn send(&mut self, input: JobInput, op: MaskOp) -> Result<u64, SelectionError> {
        let id = self.next_id;
        let jobs = self.jobs.as_ref().ok_or(SelectionError::WorkerStopped)?;
        jobs.send(MaskJob { id, input, op })
            .map_err(|_| SelectionError::WorkerStopped)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Non-blocking poll for a finished job.
    pub fn try_recv(&self) -> Option<MaskResult> {
        self.results.try_recv().ok()
    }

    /// Wait up to `timeout` for a finished job.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<MaskResult> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Stop accepting jobs and wait for the thread to finish queued work.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Mask worker panicked");
            }
            info!("Mask worker stopped");
        }
    }
}

impl Drop for MaskWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::{CanvasSize, PixelRect};

    #[test]
    fn worker_runs_jobs_in_order() {
        let mut worker = MaskWorker::spawn().unwrap();
        let canvas = CanvasSize::new(16, 16);
        let input = Arc::new(Mask::from_rect(canvas, PixelRect::new(4, 4, 4, 4)));

        let a = worker.submit(Arc::clone(&input), MaskOp::Invert).unwrap();
        let b = worker.submit(Arc::clone(&input), MaskOp::Expand(1)).unwrap();

        let first = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!((first.id, second.id), (a, b));
        assert_eq!(first.input_version, input.version());
        assert_eq!(first.output.coverage(0, 0), 255);
        assert!(second.output.is_selected(3, 5));
        worker.shutdown();
    }

    #[test]
    fn chained_jobs_run_on_previous_output() {
        let mut worker = MaskWorker::spawn().unwrap();
        let canvas = CanvasSize::new(16, 16);
        let input = Arc::new(Mask::from_rect(canvas, PixelRect::new(6, 6, 4, 4)));

        worker.submit(input, MaskOp::Expand(1)).unwrap();
        worker.submit_chained(MaskOp::Expand(1)).unwrap();

        let first = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.input_version, first.output.version());
        assert_eq!(second.output.bounds(), Some(PixelRect::new(4, 4, 8, 8)));
    }

    #[test]
    fn chained_job_without_predecessor_is_skipped() {
        let mut worker = MaskWorker::spawn().unwrap();
        worker.submit_chained(MaskOp::Invert).unwrap();
        assert!(worker.recv_timeout(Duration::from_millis(200)).is_none());
    }
}
