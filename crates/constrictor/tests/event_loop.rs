//! Promise/event-loop bridge behavior.

#![allow(missing_docs)]

use std::cell::Cell;
use std::rc::Rc;

use constrictor::{EvalOptions, HostFn, HostValue, Runtime};
use indoc::indoc;

#[test]
fn settimeout_promise_resolves_through_the_loop() {
    let mut rt = Runtime::new().unwrap();
    let value = rt
        .eval("new Promise(r => setTimeout(() => r('ok'), 10))")
        .unwrap();
    let HostValue::Future(future) = value else {
        panic!("expected a future, got {value:?}");
    };
    let result = rt.block_on(&future).unwrap();
    assert_eq!(result.as_str(), Some("ok"));
}

#[test]
fn resolved_promise_settles_without_timers() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::Future(future) = rt.eval("Promise.resolve(41).then(x => x + 1)").unwrap()
    else {
        panic!("expected a future");
    };
    assert_eq!(rt.block_on(&future).unwrap(), HostValue::Int(42));
}

#[test]
fn rejected_promise_surfaces_the_reason() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::Future(future) = rt
        .eval("Promise.reject(new Error('bad end'))")
        .unwrap()
    else {
        panic!("expected a future");
    };
    let err = rt.block_on(&future).unwrap_err();
    assert!(err.to_string().contains("bad end"), "got: {err}");
}

#[test]
fn wait_drains_queued_microtasks() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.done = false; Promise.resolve().then(() => { globalThis.done = true; })")
        .unwrap();
    assert_eq!(rt.eval("globalThis.done").unwrap(), HostValue::Bool(false));
    rt.wait();
    assert_eq!(rt.eval("globalThis.done").unwrap(), HostValue::Bool(true));
    assert_eq!(rt.stats().pending_jobs, 0, "job counter drains to zero");
}

#[test]
fn microtasks_run_before_expired_timers() {
    let mut rt = Runtime::new().unwrap();
    rt.eval(indoc! {r#"
        globalThis.order = [];
        setTimeout(() => order.push("timer"), 0);
        Promise.resolve().then(() => order.push("micro"));
    "#})
    .unwrap();
    rt.wait();
    assert_eq!(
        rt.eval("order.join(',')").unwrap().as_str(),
        Some("micro,timer")
    );
}

#[test]
fn cleartimeout_cancels_a_pending_timer() {
    let mut rt = Runtime::new().unwrap();
    rt.eval(indoc! {r#"
        globalThis.fired = false;
        const id = setTimeout(() => { globalThis.fired = true; }, 5);
        clearTimeout(id);
    "#})
    .unwrap();
    rt.wait();
    assert_eq!(rt.eval("globalThis.fired").unwrap(), HostValue::Bool(false));
}

#[test]
fn setinterval_repeats_until_cleared() {
    let mut rt = Runtime::new().unwrap();
    rt.eval(indoc! {r#"
        globalThis.ticks = 0;
        const id = setInterval(() => {
            globalThis.ticks += 1;
            if (globalThis.ticks >= 3) clearInterval(id);
        }, 1);
    "#})
    .unwrap();
    rt.wait();
    assert_eq!(rt.eval("globalThis.ticks").unwrap(), HostValue::Int(3));
}

#[test]
fn timer_binding_manages_refs_and_cancellation() {
    let mut rt = Runtime::new().unwrap();
    rt.eval(indoc! {r#"
        const timers = internalBinding("timers");
        globalThis.id = timers.enqueueWithDelay(() => {}, 60);
        globalThis.hadRef = timers.timerHasRef(id);
        timers.timerRemoveRef(id);
        globalThis.refAfterRemove = timers.timerHasRef(id);
        timers.timerAddRef(id);
        timers.cancelByTimeoutId(id);
        globalThis.refAfterCancel = timers.timerHasRef(id);
        timers.cancelByTimeoutId(9999); // unknown ids do nothing
    "#})
    .unwrap();
    assert_eq!(rt.eval("hadRef").unwrap(), HostValue::Bool(true));
    assert_eq!(rt.eval("refAfterRemove").unwrap(), HostValue::Bool(false));
    assert_eq!(rt.eval("refAfterCancel").unwrap(), HostValue::Bool(false));
    // The cancelled 60-second timer must not hold `wait()` hostage.
    rt.wait();
}

#[test]
fn host_future_crosses_as_a_promise() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.seen = null").unwrap();

    // A pending host future handed to JS as a promise, settled from host
    // code afterwards.
    let future = rt.create_future();
    rt.define_global("fromHost", &HostValue::Future(future.clone()))
        .unwrap();
    rt.eval("fromHost.then(v => { globalThis.seen = v; })").unwrap();

    future.set_result(HostValue::Int(7));
    rt.wait();
    assert_eq!(rt.eval("globalThis.seen").unwrap(), HostValue::Int(7));
}

#[test]
fn cancelled_future_leaves_the_promise_pending() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::Future(future) =
        rt.eval("new Promise(r => setTimeout(r, 30))").unwrap()
    else {
        panic!();
    };
    rt.define_global("p", &HostValue::Future(future.clone())).unwrap();
    rt.eval("globalThis.settled = false; p.then(() => { globalThis.settled = true; })")
        .unwrap();
    assert!(future.cancel());
    assert!(future.is_cancelled());
    rt.wait();
    // No retroactive settlement of the JS side by the cancellation itself.
    assert_eq!(rt.eval("globalThis.settled").unwrap(), HostValue::Bool(false));
}

#[test]
fn unhandled_rejection_reports_exactly_once() {
    let mut rt = Runtime::new().unwrap();
    let hits = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&hits);
    rt.set_exception_handler(Some(Rc::new(move |_err| {
        seen.set(seen.get() + 1);
    })));

    // The rejected promise must not be the eval result itself, or the
    // result conversion would count as handling it.
    rt.eval("void Promise.reject(new Error('nobody cares'))")
        .unwrap();
    rt.wait();
    assert_eq!(hits.get(), 1);

    // A handled rejection does not report.
    rt.eval("void Promise.reject(new Error('handled')).catch(() => {})")
        .unwrap();
    rt.wait();
    assert_eq!(hits.get(), 1);
}

#[test]
fn muted_errors_suppress_rejection_reports() {
    let mut rt = Runtime::new().unwrap();
    let hits = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&hits);
    rt.set_exception_handler(Some(Rc::new(move |_err| {
        seen.set(seen.get() + 1);
    })));

    let options = EvalOptions {
        muted_errors: true,
        ..Default::default()
    };
    rt.eval_with("void Promise.reject(new Error('quiet'))", &options)
        .unwrap();
    rt.wait();
    assert_eq!(hits.get(), 0);
}

#[test]
fn channel_posts_work_from_another_thread() {
    let mut rt = Runtime::new().unwrap();
    rt.define_global("counter", &HostValue::Int(0)).unwrap();
    let mut channel = rt.channel();
    channel.reference();

    let worker = std::thread::spawn({
        let channel = channel.clone();
        move || {
            for i in 0..3 {
                channel.send(move |cx| {
                    let _ = cx.eval(&format!("globalThis.counter += {i} + 1"));
                });
            }
        }
    });
    worker.join().unwrap();
    channel.unref();
    rt.wait();
    assert_eq!(rt.eval("globalThis.counter").unwrap(), HostValue::Int(6));
}

#[test]
fn host_callable_can_schedule_loop_work() {
    let mut rt = Runtime::new().unwrap();
    let tick = HostFn::new("tick", |cx, _args| cx.eval("globalThis.tocked = true"));
    rt.define_global("tick", &HostValue::Func(tick)).unwrap();
    rt.eval("setTimeout(() => tick(), 1)").unwrap();
    rt.wait();
    assert_eq!(rt.eval("globalThis.tocked").unwrap(), HostValue::Bool(true));
}
