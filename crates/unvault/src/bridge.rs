//! Bridge between the session's pre-resolved sink table and the engine's
//! pull-based extraction protocol.

use std::io::Write;

use tracing::warn;
use unvault_engine::{ExtractCallback, OperationResult};

/// One output slot per entry index. `None` marks entries that were
/// skipped, are folders, or whose sink has already been released.
///
/// A sink handed out by `get_stream` stays alive until that index's
/// `set_operation_result` arrives; the engine writes incrementally, not
/// in one shot. Sinks the engine never finished (early engine failure)
/// are released when the bridge is dropped, so every sink is released
/// exactly once on every exit path.
pub(crate) struct ExtractBridge<'a> {
    sinks: Vec<Option<Box<dyn Write + 'a>>>,
    first_failure: Option<(u32, OperationResult)>,
    total: u64,
    completed: u64,
}

impl<'a> ExtractBridge<'a> {
    pub(crate) fn new(sinks: Vec<Option<Box<dyn Write + 'a>>>) -> Self {
        Self {
            sinks,
            first_failure: None,
            total: 0,
            completed: 0,
        }
    }

    /// The first non-OK completion the engine reported, if any.
    pub(crate) fn first_failure(&self) -> Option<(u32, OperationResult)> {
        self.first_failure
    }
}

impl ExtractCallback for ExtractBridge<'_> {
    fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    fn set_completed(&mut self, completed: u64) {
        self.completed = completed;
    }

    fn get_stream(&mut self, index: u32) -> unvault_engine::Result<Option<&mut dyn Write>> {
        Ok(self
            .sinks
            .get_mut(index as usize)
            .and_then(|slot| slot.as_mut())
            .map(|sink| sink.as_mut() as &mut dyn Write))
    }

    fn set_operation_result(&mut self, index: u32, result: OperationResult) {
        // The engine is done writing this index; release its sink now.
        if let Some(slot) = self.sinks.get_mut(index as usize) {
            slot.take();
        }
        if !result.is_ok() {
            warn!(index, ?result, "entry extraction failed");
            if self.first_failure.is_none() {
                self.first_failure = Some((index, result));
            }
        }
    }
}
