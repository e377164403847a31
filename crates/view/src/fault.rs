//! Fault observers

use blotter_ports::{Fault, FaultObserver};
use parking_lot::Mutex;

/// Reports faults through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultObserver;

impl FaultObserver for LogFaultObserver {
    fn on_fault(&self, fault: Fault) {
        match fault {
            Fault::Projection { trade_id, error } => {
                log::warn!("Trade {} left out of view: {}", trade_id, error);
            }
            Fault::Control { control, reason } => {
                log::warn!("{} control fell back to default: {}", control, reason);
            }
        }
    }
}

/// Keeps every fault for later inspection
#[derive(Debug, Default)]
pub struct RecordingFaultObserver {
    faults: Mutex<Vec<Fault>>,
}

impl RecordingFaultObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.faults.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.lock().is_empty()
    }
}

impl FaultObserver for RecordingFaultObserver {
    fn on_fault(&self, fault: Fault) {
        LogFaultObserver.on_fault(fault.clone());
        self.faults.lock().push(fault);
    }
}
