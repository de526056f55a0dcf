//! The lifetime coordinator: owns the JS context, the realm's bootstrap
//! roots, the job bridge and the host event loop, and tears them down in
//! order at shutdown.

mod hooks;
pub(crate) mod state;

use std::panic::Location;
use std::path::PathBuf;
use std::rc::Rc;

use crate::binding;
use crate::context::Cx;
use crate::convert;
use crate::error::{EngineError, HostError, HostResult};
use crate::event::{Channel, EventLoop, ExceptionHandler, HostFuture, JobBridge, LoopShared};
use crate::host::HostValue;
use crate::proxy::ProxyHandlers;
use crate::sys::{self, Helpers};

/// Options for one evaluation.
#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    /// Compilation unit name shown in error locations.
    pub filename: Option<PathBuf>,
    /// First-line offset, used in error reporting.
    pub lineno: u32,
    /// First-column offset, used in error reporting.
    pub column: u32,
    /// Silence uncaught errors and unhandled rejections from this unit.
    pub muted_errors: bool,
    /// The script does not produce a return value.
    pub no_script_rval: bool,
    /// Accepted for compatibility; the engine has no self-hosting
    /// compilation mode.
    pub self_hosting: bool,
    /// Force strict mode.
    pub strict: bool,
    /// Treat the source as a module.
    pub module: bool,
    /// Infer `filename`/`lineno` from the calling host frame when not set
    /// explicitly.
    pub from_host_frame: bool,
}

/// Aggregate bridge accounting, exposed for diagnostics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Live host→JS proxies.
    pub live_proxies: usize,
    /// Live wrapped host callables.
    pub live_functions: usize,
    /// Entries in the two-way string table.
    pub interned_strings: usize,
    /// Jobs still in flight on the event loop.
    pub pending_jobs: usize,
}

/// An embedded JS engine bridged to the host value model.
///
/// Exactly one runtime may exist per thread; the engine context it owns is
/// single-threaded, and every entry point takes `&mut self`, which is the
/// structural form of holding the interpreter mutex.
pub struct Runtime {
    event_loop: EventLoop,
    shared: Rc<LoopShared>,
    /// `Option` so shutdown can drop the context before the final GC pass.
    context: Option<sys::Context>,
}

impl Runtime {
    /// Build the runtime: engine context, job bridge, bootstrap helpers,
    /// proxy handler tables, and the timer/binding globals.
    pub fn new() -> HostResult<Runtime> {
        state::with(|s| {
            if s.initialized.get() {
                return Err(HostError::Runtime(
                    "a runtime already exists on this thread".into(),
                ));
            }
            Ok(())
        })?;

        let shared = LoopShared::new();
        let queue = Rc::new(JobBridge::new(Rc::clone(&shared)));
        let mut context = sys::new_context(queue, hooks::HOOKS)?;

        let helpers = Helpers::install(&mut context)?;
        state::with(|s| {
            s.finalizing.set(false);
            s.set_helpers(helpers);
            s.set_loop_shared(Rc::clone(&shared));
        });
        let handlers = ProxyHandlers::install(&mut context);
        state::with(|s| s.set_proxy_handlers(handlers));

        binding::install_internal_binding(&mut context);
        binding::install_timer_globals(&mut context);

        state::with(|s| s.initialized.set(true));
        log::debug!("runtime initialized");

        Ok(Runtime {
            event_loop: EventLoop::new(Rc::clone(&shared)),
            shared,
            context: Some(context),
        })
    }

    fn ctx(&mut self) -> &mut sys::Context {
        self.context.as_mut().expect("runtime context alive")
    }

    /// Compile and run JS source, returning the result as a host value.
    #[track_caller]
    pub fn eval(&mut self, source: &str) -> HostResult<HostValue> {
        self.eval_with(source, &EvalOptions::default())
    }

    /// [`Runtime::eval`] with explicit options.
    #[track_caller]
    pub fn eval_with(&mut self, source: &str, options: &EvalOptions) -> HostResult<HostValue> {
        let caller = Location::caller();

        let mut filename = options.filename.clone();
        let mut lineno = options.lineno;
        if options.from_host_frame {
            if filename.is_none() {
                filename = Some(PathBuf::from(caller.file()));
            }
            if lineno == 0 {
                lineno = caller.line();
            }
        }

        // Strict mode is realized by prelude injection; the engine exposes
        // no force-strict compile flag.
        let prepared;
        let source = if options.strict && !options.module {
            prepared = format!("\"use strict\";\n{source}");
            prepared.as_str()
        } else {
            source
        };

        let previous_muted = state::with(|s| {
            let previous = s.muted.get();
            s.muted.set(options.muted_errors);
            previous
        });

        let result = if options.module {
            self.eval_module(source, filename.as_deref())
        } else {
            let value = sys::eval_source(self.ctx(), source, filename.as_deref());
            match value {
                Ok(value) => {
                    if options.no_script_rval {
                        Ok(HostValue::None)
                    } else {
                        convert::to_host(self.ctx(), &value)
                    }
                }
                Err(err) => Err(err),
            }
        };

        if !options.muted_errors {
            self.drain_rejections();
        }
        state::with(|s| s.muted.set(previous_muted));

        result.map_err(|err| annotate_location(err, filename.as_deref(), lineno, options.column))
    }

    fn eval_module(
        &mut self,
        source: &str,
        path: Option<&std::path::Path>,
    ) -> HostResult<HostValue> {
        let promise = sys::eval_module(self.ctx(), source, path)?;
        // Give module evaluation its synchronous jobs.
        self.run_loop_until_idle();
        match convert::promise_details(&promise) {
            Some((1, _)) => Ok(HostValue::None),
            Some((2, Some(reason))) => {
                let err = crate::error::engine_error(
                    sys::JsError::from_opaque(reason),
                    self.ctx(),
                );
                Err(err)
            }
            _ => {
                // Still pending (e.g. top-level await on host work): hand
                // the caller the future.
                let future = convert::js_promise_to_future(self.ctx(), &promise)?;
                Ok(HostValue::Future(future))
            }
        }
    }

    /// Force an engine GC cycle.
    pub fn collect(&mut self) {
        sys::force_gc();
    }

    /// Whether `source` parses as a complete compilable unit (REPL
    /// buffering hint).
    pub fn is_compilable_unit(&mut self, source: &str) -> bool {
        sys::is_compilable_unit(self.ctx(), source)
    }

    /// Drive the event loop until all asynchronous work drains: the job
    /// counter is zero, no referenced timers are pending and no referenced
    /// channels are held.
    pub fn wait(&mut self) {
        self.run_loop_until_idle();
        self.drain_rejections();
    }

    fn run_loop_until_idle(&mut self) {
        let context = self.context.as_mut().expect("runtime context alive");
        let mut cx = Cx::new(context);
        self.event_loop.run_until_idle(&mut cx);
    }

    /// Drive the event loop until the future settles, then return its
    /// result.
    pub fn block_on(&mut self, future: &HostFuture) -> HostResult<HostValue> {
        let context = self.context.as_mut().expect("runtime context alive");
        let mut cx = Cx::new(context);
        let done = self
            .event_loop
            .run_until(&mut cx, |_| future.is_done() || future.is_cancelled());
        self.drain_rejections();
        if !done {
            return Err(HostError::Runtime(
                "event loop went idle before the future settled".into(),
            ));
        }
        future.result()
    }

    /// Run host code with engine access (conversions, proxy operations,
    /// calls into JS).
    pub fn enter<R>(&mut self, f: impl FnOnce(&mut Cx<'_>) -> R) -> R {
        let context = self.context.as_mut().expect("runtime context alive");
        f(&mut Cx::new(context))
    }

    /// A `Send` handle for posting closures onto this runtime's event loop
    /// from other threads.
    pub fn channel(&self) -> Channel {
        Channel::new(&self.shared)
    }

    /// A pending host future attached to this runtime's event loop.
    pub fn create_future(&self) -> HostFuture {
        HostFuture::new(Rc::clone(&self.shared))
    }

    /// Install (or clear) the loop's exception handler for errors nobody
    /// awaited. Without one, unhandled errors are logged.
    pub fn set_exception_handler(&self, handler: Option<ExceptionHandler>) {
        self.shared.set_exception_handler(handler);
    }

    /// The namespace object for `internal_binding(namespace)`, as a host
    /// value.
    pub fn internal_binding(&mut self, namespace: &str) -> HostResult<HostValue> {
        let value = binding::namespace_object(self.ctx(), namespace)
            .map_err(|e| crate::error::engine_error(e, self.ctx()))?;
        convert::to_host(self.ctx(), &value)
    }

    /// Define a global in the JS realm from a host value.
    pub fn define_global(&mut self, name: &str, value: &HostValue) -> HostResult<()> {
        let js = convert::to_js(self.ctx(), value)?;
        let global = sys::global_object(self.ctx());
        global
            .set(sys::js_string_key(name), js, false, self.ctx())
            .map_err(|e| crate::error::engine_error(e, self.ctx()))?;
        Ok(())
    }

    /// Bridge accounting.
    pub fn stats(&self) -> RuntimeStats {
        state::with(|s| RuntimeStats {
            live_proxies: s.live_proxies(),
            live_functions: s.live_functions(),
            interned_strings: s.strings.borrow().len(),
            pending_jobs: self.shared.job_count(),
        })
    }

    /// Report any still-unhandled promise rejections through the loop's
    /// exception handler, exactly once each.
    fn drain_rejections(&mut self) {
        let pending = state::with(|s| std::mem::take(&mut *s.rejections.borrow_mut()));
        if pending.is_empty() {
            return;
        }
        let muted = state::with(|s| s.muted.get());
        for promise in pending {
            if muted {
                continue;
            }
            convert::materialize_rejection(self.ctx(), &promise);
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        log::debug!("runtime shutting down");
        // Shutdown order: registries and bootstrap roots first, then the
        // job queue, then the context, then one final collection. The
        // finalizing flag set by `teardown` makes late slot finalizers
        // skip their ledger work.
        state::with(|s| s.teardown());
        drop(self.context.take());
        sys::force_gc();
    }
}

/// Attach the eval options' source location to an engine error message.
fn annotate_location(
    err: HostError,
    filename: Option<&std::path::Path>,
    lineno: u32,
    column: u32,
) -> HostError {
    if lineno == 0 && column == 0 {
        return err;
    }
    match err {
        HostError::Engine(engine) => {
            let mut message = engine.message().to_string();
            let name = filename
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<eval>".into());
            message.push_str(&format!("\n    (unit {name}, offset {lineno}:{column})"));
            HostError::Engine(EngineError {
                message,
                js_error: engine.js_error().cloned(),
            })
        }
        other => other,
    }
}
