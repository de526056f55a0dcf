//! Engine host hooks: unhandled-rejection tracking.

use boa_engine::builtins::promise::OperationType;
use boa_engine::context::HostHooks;
use boa_engine::{Context, JsObject};

use crate::runtime::state;
use crate::sys;

/// The bridge's host hooks. Only the rejection tracker is overridden; time
/// and compilation hooks keep their engine defaults.
pub(crate) struct BridgeHooks;

pub(crate) static HOOKS: &BridgeHooks = &BridgeHooks;

impl HostHooks for BridgeHooks {
    fn promise_rejection_tracker(
        &self,
        promise: &JsObject,
        operation: OperationType,
        _context: &mut Context,
    ) {
        state::with(|s| {
            if !s.initialized.get() || s.finalizing.get() {
                return;
            }
            match operation {
                OperationType::Reject => {
                    if s.muted.get() {
                        return;
                    }
                    log::trace!("tracking unhandled promise rejection");
                    s.rejections.borrow_mut().push(promise.clone());
                }
                OperationType::Handle => {
                    // A handler showed up after all; stand down.
                    s.rejections
                        .borrow_mut()
                        .retain(|p| !sys::object_ptr_eq(p, promise));
                }
            }
        });
    }
}
