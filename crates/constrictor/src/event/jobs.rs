//! The engine job-queue contract, bound to the host event loop.

use std::rc::Rc;

use crate::context::Cx;
use crate::sys::{Context, FutureJob, JobQueue, NativeJob};

use super::LoopShared;

/// Routes engine jobs onto the host event loop.
///
/// Promise microtasks become loop jobs (`call_soon`); engine future-jobs
/// are driven to completion and re-enqueued; `run_jobs` itself does nothing
/// because the loop, not the engine, drains the queue.
pub(crate) struct JobBridge {
    shared: Rc<LoopShared>,
}

impl JobBridge {
    pub(crate) fn new(shared: Rc<LoopShared>) -> Self {
        JobBridge { shared }
    }
}

impl JobQueue for JobBridge {
    fn enqueue_promise_job(&self, job: NativeJob, _context: &mut Context) {
        log::trace!("enqueue promise job");
        self.shared.call_soon(Box::new(move |cx: &mut Cx<'_>| {
            if let Err(err) = job.call(cx.cx()) {
                // A failed reaction job surfaces through the rejection
                // tracker, not here.
                log::debug!("promise job failed: {err}");
            }
        }));
    }

    fn enqueue_future_job(&self, future: FutureJob, context: &mut Context) {
        // The engine hands us an in-flight native future whose output is
        // the job to run. Drive it to completion off the JS stack, then
        // queue the job like any other microtask.
        let job = pollster::block_on(future);
        self.enqueue_promise_job(job, context);
    }

    fn run_jobs(&self, _context: &mut Context) {
        // Draining happens on the host event loop; see `EventLoop`.
    }
}
