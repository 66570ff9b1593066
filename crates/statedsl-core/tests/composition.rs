//! `include`, `extend` and bulk merge of declarative documents.

use pretty_assertions::assert_eq;
use serde_json::json;
use statedsl_core::{Args, RenderContext, Registry};
use statedsl_model::HighState;

#[test]
fn include_extend() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.include(["some.sls.file", "another.sls.file", "more.sls.file"]);
        let a = r
            .state(Some("A"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo hoho").kw("cwd", "/"))?
            .state_id()
            .clone();
        r.state(Some("B"))?
            .module("cmd")?
            .function("run", Args::new().arg("echo hehe").kw("cwd", "/"))?;
        let x = r
            .state(Some("X"))?
            .module("cmd")?
            .function("run", Args::new().kw("cwd", "/a/b/c"))?
            .state_id()
            .clone();
        let y = r
            .state(Some("Y"))?
            .declare("file", "managed", Args::new().kw("name", "a_file.txt"))?
            .state_id()
            .clone();
        let z = r
            .state(Some("Z"))?
            .module("service")?
            .invoke(Some("watch"), Args::new().kw("file", "A"))?
            .state_id()
            .clone();
        r.extend([&a, &x, &y, &z])
    })
    .expect("render");

    let result = rendered.high.to_value();
    assert_eq!(rendered.high.len(), 3);
    assert_eq!(
        result["include"],
        json!(["some.sls.file", "another.sls.file", "more.sls.file"])
    );
    assert_eq!(
        result["extend"],
        json!({
            "A": {"cmd": ["run", {"name": "echo hoho"}, {"cwd": "/"}]},
            "X": {"cmd": ["run", {"cwd": "/a/b/c"}]},
            "Y": {"file": ["managed", {"name": "a_file.txt"}]},
            "Z": {"service": [{"watch": [{"file": "A"}]}]}
        })
    );
    assert_eq!(result["B"]["cmd"][0], json!("run"));
    assert!(!rendered.high.contains("A"));
    let ids: Vec<&str> = rendered.high.state_ids().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["B"]);
}

#[test]
fn include_keeps_duplicates_verbatim() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.include(["x", "y"]);
        r.include(["x"]);
        Ok(())
    })
    .expect("render");
    assert_eq!(rendered.high.include, vec!["x", "y", "x"]);
    assert!(rendered.high.states.is_empty());
}

#[test]
fn state_referenced_after_extend_returns_to_the_main_output() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        let id = r
            .state(Some("A"))?
            .module("cmd")?
            .invoke(Some("require"), Args::new().kw("pkg", "git"))?
            .state_id()
            .clone();
        r.extend([&id])?;
        r.state(Some("A"))?
            .module("cmd")?
            .function("run", Args::new().arg("git pull"))?;
        Ok(())
    })
    .expect("render");
    assert_eq!(
        rendered.high.get_extend("A").map(|decl| decl.to_value()),
        Some(json!({"cmd": [{"require": [{"pkg": "git"}]}]}))
    );
    assert_eq!(
        rendered.high.get("A").map(|decl| decl.to_value()),
        Some(json!({"cmd": ["run", {"name": "git pull"}]}))
    );
}

#[test]
fn re_extending_merges_modules() {
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        let id = r
            .state(Some("svc"))?
            .declare("service", "running", Args::new())?
            .state_id()
            .clone();
        r.extend([&id])?;
        r.state(Some("svc"))?
            .declare("file", "managed", Args::new().kw("source", "salt://svc.conf"))?;
        r.extend([&id])?;
        Ok(())
    })
    .expect("render");
    assert!(rendered.high.states.is_empty());
    assert_eq!(
        rendered.high.get_extend("svc").map(|decl| decl.to_value()),
        Some(json!({
            "service": ["running"],
            "file": ["managed", {"source": "salt://svc.conf"}]
        }))
    );
}

const DOCUMENT: &str = r"
A:
  cmd.run:
    - name: echo hello
    - cwd: /
B:
  pkg:
    - installed
  service:
    - running
    - require:
      - pkg: B
    - watch:
      - cmd: A
";

#[test]
fn load_highstate() {
    let high: HighState = serde_yaml::from_str(DOCUMENT).expect("document");
    let rendered = Registry::render(RenderContext::new("test"), |r| {
        r.load_highstate(&high)?;
        r.state(Some("A"))?
            .module("cmd")?
            .function("run", Args::new().kw("name", "echo hello world"))?;
        Ok(())
    })
    .expect("render");
    let result = rendered.high.to_value();
    assert_eq!(rendered.high.len(), 2);
    assert_eq!(
        result["A"]["cmd"],
        json!(["run", {"name": "echo hello"}, {"cwd": "/"}, {"name": "echo hello world"}])
    );
    assert_eq!(
        result["B"]["service"],
        json!([
            "running",
            {"require": [{"pkg": "B"}]},
            {"watch": [{"cmd": "A"}]}
        ])
    );
}

#[test]
fn bulk_merge_round_trips() {
    let document = json!({
        "include": ["base.users"],
        "extend": {"sshd": {"service": [{"watch": [{"file": "sshd_config"}]}]}},
        "A": {"cmd": ["run", {"name": "echo hello"}, {"cwd": "/"}]},
        "B": {
            "pkg": ["installed"],
            "service": ["running", {"require": [{"pkg": "B"}]}]
        },
        "empty": {}
    });
    let high = HighState::from_value(&document).expect("document");
    let rendered = Registry::render(RenderContext::new("test"), |r| r.load_highstate(&high))
        .expect("render");
    assert_eq!(rendered.high, high);
    assert_eq!(rendered.high.to_value(), document);
}
