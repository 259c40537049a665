//! Double-buffered flow field with an optional background worker.
//!
//! Units always read the active field through an `Arc`. A new field is
//! installed only once it is fully built; with a worker the simulation keeps
//! steering on the previous field until the result for the latest requested
//! epoch arrives, and results for superseded epochs are dropped.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use rampart_core::config::GridConfig;
use rampart_core::types::Cell;

use crate::flow_field::FlowField;
use crate::obstacles::ObstacleGrid;

struct FlowRequest {
    grid: GridConfig,
    obstacles: ObstacleGrid,
    goal: Cell,
}

struct FlowWorker {
    request_tx: Option<Sender<FlowRequest>>,
    result_rx: Receiver<FlowField>,
    handle: Option<JoinHandle<()>>,
}

impl FlowWorker {
    fn start() -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<FlowRequest>();
        let (result_tx, result_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("flow-field".to_string())
            .spawn(move || run_worker(request_rx, result_tx))?;

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            handle: Some(handle),
        })
    }
}

fn run_worker(rx: Receiver<FlowRequest>, tx: Sender<FlowField>) {
    while let Ok(mut request) = rx.recv() {
        // Only the newest obstacle state matters.
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }
        let field = FlowField::compute(&request.grid, &request.obstacles, request.goal);
        if tx.send(field).is_err() {
            break;
        }
    }
}

impl Drop for FlowWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub struct FlowFieldBuffer {
    active: Arc<FlowField>,
    requested_epoch: u64,
    worker: Option<FlowWorker>,
}

impl FlowFieldBuffer {
    /// Buffer that recomputes inline on the simulation thread.
    pub fn new_sync(grid: &GridConfig, obstacles: &ObstacleGrid, goal: Cell) -> Self {
        let field = FlowField::compute(grid, obstacles, goal);
        log_installed(&field);
        Self {
            requested_epoch: field.epoch(),
            active: Arc::new(field),
            worker: None,
        }
    }

    /// Buffer that recomputes on a background thread. The initial field is
    /// built inline so units have something to follow on the first tick.
    pub fn new_async(grid: &GridConfig, obstacles: &ObstacleGrid, goal: Cell) -> Self {
        let mut buffer = Self::new_sync(grid, obstacles, goal);
        match FlowWorker::start() {
            Ok(worker) => buffer.worker = Some(worker),
            Err(err) => warn!("flow field worker failed to start, recomputing inline: {err}"),
        }
        buffer
    }

    /// The field units should currently follow.
    pub fn active(&self) -> Arc<FlowField> {
        Arc::clone(&self.active)
    }

    pub fn active_epoch(&self) -> u64 {
        self.active.epoch()
    }

    pub fn requested_epoch(&self) -> u64 {
        self.requested_epoch
    }

    pub fn is_async(&self) -> bool {
        self.worker.is_some()
    }

    /// Install finished results and request a rebuild if the obstacle epoch
    /// moved. Returns true when a new field became active.
    pub fn refresh(&mut self, grid: &GridConfig, obstacles: &ObstacleGrid, goal: Cell) -> bool {
        let swapped = self.poll_worker();

        if obstacles.epoch() == self.requested_epoch {
            return swapped;
        }
        self.requested_epoch = obstacles.epoch();

        if let Some(tx) = self.worker.as_ref().and_then(|w| w.request_tx.as_ref()) {
            let request = FlowRequest {
                grid: *grid,
                obstacles: obstacles.clone(),
                goal,
            };
            if tx.send(request).is_ok() {
                debug!("flow field epoch {} handed to worker", self.requested_epoch);
                return swapped;
            }
            warn!("flow field worker disconnected, recomputing inline");
            self.worker = None;
        }

        self.install(FlowField::compute(grid, obstacles, goal));
        true
    }

    /// Block until the field for the latest requested epoch is active.
    pub fn wait_until_current(&mut self) {
        while self.active.epoch() != self.requested_epoch {
            let Some(worker) = self.worker.as_ref() else {
                return;
            };
            match worker.result_rx.recv() {
                Ok(field) => {
                    self.accept(field);
                }
                Err(_) => {
                    warn!("flow field worker disconnected while waiting");
                    self.worker = None;
                    return;
                }
            }
        }
    }

    fn poll_worker(&mut self) -> bool {
        let mut swapped = false;
        loop {
            let Some(worker) = self.worker.as_ref() else {
                return swapped;
            };
            match worker.result_rx.try_recv() {
                Ok(field) => swapped |= self.accept(field),
                Err(TryRecvError::Empty) => return swapped,
                Err(TryRecvError::Disconnected) => {
                    warn!("flow field worker disconnected, recomputing inline from now on");
                    self.worker = None;
                    return swapped;
                }
            }
        }
    }

    fn accept(&mut self, field: FlowField) -> bool {
        if field.epoch() != self.requested_epoch {
            debug!(
                "discarding flow field for epoch {} (requested {})",
                field.epoch(),
                self.requested_epoch
            );
            return false;
        }
        self.install(field);
        true
    }

    fn install(&mut self, field: FlowField) {
        log_installed(&field);
        self.active = Arc::new(field);
    }
}

fn log_installed(field: &FlowField) {
    info!(
        "flow field epoch {} active ({} reachable cells)",
        field.epoch(),
        field.reachable_cells()
    );
}
