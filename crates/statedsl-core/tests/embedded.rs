//! Embedded callables recorded as `call` actions.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use statedsl_core::{
    Args, Callable, EmbeddedCallError, FunctionCatalog, RenderContext, RenderError, Registry,
};

fn do_something() -> Callable {
    let some_var = 12345;
    Callable::new("do_something", move |args: &[Value], kws: &Map<String, Value>| {
        Ok(json!({
            "result": true,
            "changes": {
                "a": args.first(),
                "b": args.get(1),
                "args": args.get(2..).unwrap_or_default(),
                "kws": kws,
                "some_var": some_var,
            }
        }))
    })
}

#[test]
fn cmd_call() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.state(Some("A"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo this is state A").kw("cwd", "/"))?;
        let a_cmd = r.state(Some("A"))?.module("cmd")?.target();
        r.state(Some("C"))?
            .module("cmd")?
            .call(
                do_something(),
                Args::new().arg(1).arg(2).arg(3).kw("x", 1).kw("y", 2),
            )?
            .require(a_cmd)?;
        let c_cmd = r.state(Some("C"))?.module("cmd")?.target();
        r.state(Some("G"))?
            .module("cmd")?
            .function("wait", Args::new().arg("echo this is state G").kw("cwd", "/"))?
            .watch(c_cmd)?;
        Ok(())
    })
    .expect("render");

    let result = rendered.high.to_value();
    assert_eq!(
        result["C"]["cmd"],
        json!([
            "call",
            {"name": "do_something"},
            {"func": "C::do_something#0"},
            {"args": [1, 2, 3]},
            {"kws": {"x": 1, "y": 2}},
            {"require": [{"cmd": "A"}]}
        ])
    );
    assert_eq!(result["G"]["cmd"][3], json!({"watch": [{"cmd": "C"}]}));

    let call = rendered.call("C::do_something#0").expect("wrapper");
    assert_eq!(call.state_id, "C");
    let outcome = call.invoke().expect("invoke");
    assert!(outcome.result);
    assert_eq!(
        Value::Object(outcome.changes),
        json!({"a": 1, "b": 2, "args": [3], "kws": {"x": 1, "y": 2}, "some_var": 12345})
    );
}

#[test]
fn wrapper_ids_are_unique_per_render() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.state(Some("C"))?
            .module("cmd")?
            .call(do_something(), Args::new())?;
        r.state(Some("D"))?
            .module("cmd")?
            .call(do_something(), Args::new())?;
        r.state(None)?
            .module("cmd")?
            .call(do_something(), Args::new())?;
        Ok(())
    })
    .expect("render");
    let ids: Vec<&str> = rendered.calls.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec![
            ".anon-2::do_something#3",
            "C::do_something#0",
            "D::do_something#1"
        ]
    );
}

#[test]
fn callables_resolve_through_the_catalog() {
    let catalog = Arc::new(FunctionCatalog::new().with(do_something()));
    let context = RenderContext::new("test").with_catalog(catalog);
    let rendered = Registry::render(context, |r| {
        r.state(Some("C"))?
            .module("cmd")?
            .call_named("do_something", Args::new().arg("a").arg("b"))?;
        Ok(())
    })
    .expect("render");
    let call = rendered.call("C::do_something#0").expect("wrapper");
    assert_eq!(call.callable.name(), "do_something");
    assert_eq!(call.args, vec![json!("a"), json!("b")]);
}

#[test]
fn failing_callables_surface_at_invocation() {
    let failing = Callable::new("explode", |_: &[Value], _: &Map<String, Value>| {
        anyhow::bail!("disk full")
    });
    let malformed = Callable::new("shrug", |_: &[Value], _: &Map<String, Value>| {
        Ok(json!("done"))
    });
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.state(Some("E"))?
            .module("cmd")?
            .call(failing, Args::new())?;
        r.state(Some("F"))?
            .module("cmd")?
            .call(malformed, Args::new())?;
        Ok(())
    })
    .expect("rendering never runs the callable");

    let err = rendered
        .call("E::explode#0")
        .expect("wrapper")
        .invoke()
        .expect_err("raised");
    assert!(matches!(err, EmbeddedCallError::Raised { .. }));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("disk full"));

    let err = rendered
        .call("F::shrug#1")
        .expect("wrapper")
        .invoke()
        .expect_err("malformed");
    assert!(matches!(err, EmbeddedCallError::MalformedResult { .. }));
}

#[test]
fn a_node_holds_one_embedded_call() {
    let mut registry = Registry::new(RenderContext::new("test"));
    registry
        .state(Some("C"))
        .and_then(|s| s.module("cmd"))
        .and_then(|n| n.call(do_something(), Args::new().arg(1)))
        .expect("first call");
    let err = registry
        .state(Some("C"))
        .and_then(|s| s.module("cmd"))
        .and_then(|n| n.call(do_something(), Args::new().arg(2)))
        .err()
        .expect("second call rejected");
    assert!(matches!(
        err,
        RenderError::InvalidArguments { ref state_id, ref module, .. }
            if state_id == "C" && module == "cmd"
    ));

    let rendered = registry.finalize().expect("render");
    assert_eq!(rendered.calls.len(), 1);
    assert_eq!(
        rendered.high.to_value()["C"]["cmd"],
        json!(["call", {"name": "do_something"}, {"func": "C::do_something#0"}, {"args": [1]}, {"kws": {}}])
    );
}
