//! Ordered mode.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use statedsl_core::{Args, RenderContext, Registry};
use statedsl_model::ORDERED_OPTION;

#[test]
fn ordered_states() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.set_option(ORDERED_OPTION, &json!(true))?;
        r.state(Some("A"))?;
        r.state(Some("B"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo bbbb"))?;
        r.state(Some("A"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo aaa"))?;
        r.state(Some("B"))?
            .module("cmd")?
            .function("run", Args::new().kw("cwd", "/"))?;
        r.state(Some("C"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo ccc"))?;
        r.state(Some("B"))?
            .module("file")?
            .function("managed", Args::new().kw("source", "/a/b/c"))?;
        Ok(())
    })
    .expect("render");
    let result = rendered.high.to_value();

    assert_eq!(
        result["B"]["cmd"],
        json!(["run", {"name": "echo bbbb"}, {"cwd": "/"}])
    );
    assert_eq!(
        result["A"]["cmd"],
        json!(["run", {"require": [{"cmd": "B"}]}, {"name": "echo aaa"}])
    );
    assert_eq!(result["C"]["cmd"][1], json!({"require": [{"cmd": "A"}]}));
    assert_eq!(result["B"]["file"][1], json!({"require": [{"cmd": "C"}]}));
}

#[test]
fn injected_require_leads_declared_requires() {
    let rendered = Registry::render(RenderContext::new("test").ordered(true), |r| {
        r.state(Some("first"))?
            .declare("pkg", "installed", Args::new())?;
        r.state(Some("second"))?
            .module("service")?
            .function("running", Args::new())?
            .invoke(Some("require"), Args::new().kw("file", "conf"))?;
        Ok(())
    })
    .expect("render");
    assert_eq!(
        rendered.high.to_value()["second"]["service"],
        json!(["running", {"require": [{"pkg": "first"}, {"file": "conf"}]}])
    );
}

#[test]
fn actions_before_the_option_are_not_chained() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.state(Some("early"))?
            .declare("cmd", "run", Args::new().arg("echo early"))?;
        r.set_option(ORDERED_OPTION, &json!(true))?;
        r.state(Some("late1"))?
            .declare("cmd", "run", Args::new().arg("echo 1"))?;
        r.state(Some("late2"))?
            .declare("cmd", "run", Args::new().arg("echo 2"))?;
        Ok(())
    })
    .expect("render");
    let result = rendered.high.to_value();
    assert_eq!(result["late1"]["cmd"].as_array().map(Vec::len), Some(2));
    assert_eq!(result["late2"]["cmd"][1], json!({"require": [{"cmd": "late1"}]}));
}

#[test]
fn ordered_renders_are_deterministic() {
    let build = || {
        Registry::render(RenderContext::new("test").ordered(true), |r| {
            for id in ["a", "b", "c"] {
                r.state(Some(id))?
                    .declare("cmd", "run", Args::new().arg(id))?;
            }
            Ok(())
        })
        .expect("render")
        .high
    };
    assert_eq!(build(), build());
}

proptest! {
    #[test]
    fn declaration_order_becomes_a_chain(count in 1usize..16) {
        let ids: Vec<String> = (0..count).map(|i| format!("D{i}")).collect();
        let rendered = Registry::render(RenderContext::new("test").ordered(true), |r| {
            for id in &ids {
                r.state(Some(id.as_str()))?
                    .declare("cmd", "run", Args::new().arg(id.as_str()))?;
            }
            Ok(())
        })
        .expect("render");
        let result = rendered.high.to_value();
        for (i, id) in ids.iter().enumerate() {
            let entries = &result[id.as_str()]["cmd"];
            if i == 0 {
                prop_assert_eq!(entries, &json!(["run", {"name": id}]));
            } else {
                let expected: Value = json!({"require": [{"cmd": ids[i - 1]}]});
                prop_assert_eq!(&entries[1], &expected);
            }
        }
    }
}
