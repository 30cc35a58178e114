//! Action runs: read-only inputs, signatures, caching, nesting and transports.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tessera_action::prelude::*;
use tessera_action::{
    ActionRegistry, ActionRuntime, Handler, HandlerError, Origin, RawValue, Reader, Writer,
};
use tessera_input::{Input, InputRegistry};
use tessera_metadata::OptionKind;

fn runtime(actions: ActionRegistry) -> Arc<ActionRuntime> {
    let _guard = tessera_log::init_test();
    Arc::new(ActionRuntime::new(
        Arc::new(InputRegistry::with_builtin_types()),
        Arc::new(actions),
    ))
}

/// Tries to overwrite its own input while running.
struct Overwrite {
    fail: bool,
}

#[async_trait]
impl Action for Overwrite {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("n: numeric")]
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        ctx.require("n")?;
        let rejected = ctx
            .input("n")
            .is_some_and(|input| input.set_value(json!(0)).is_err());
        if self.fail {
            return Err(ActionError::execution("refused"));
        }
        Ok(json!(rejected))
    }
}

/// Returns its inputs as an object.
struct Echo;

#[async_trait]
impl Action for Echo {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("a: text"), InputSpec::new("b?: numeric")]
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        Ok(Value::Object(
            ctx.values()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        ))
    }
}

#[tokio::test]
async fn inputs_are_read_only_while_running() {
    let actions = ActionRegistry::new();
    actions.register_fn("overwrite", || Overwrite { fail: false });
    let rt = runtime(actions);

    let action = rt.create("overwrite", Session::new()).unwrap();
    action.set_value("n", json!(3)).unwrap();

    assert_eq!(action.run(true).await.unwrap(), json!(true));
    let n = action.input("n").unwrap();
    assert!(!n.is_read_only());
    assert_eq!(n.value(), json!(3));
    n.set_value(json!(4)).unwrap();
}

#[tokio::test]
async fn read_only_flags_are_restored_after_failures() {
    let actions = ActionRegistry::new();
    actions.register_fn("overwrite", || Overwrite { fail: true });
    let rt = runtime(actions);

    let action = rt.create("overwrite", Session::new()).unwrap();
    action.set_value("n", json!(3)).unwrap();
    let err = action.run(true).await.unwrap_err();
    assert_eq!(err.kind(), ActionErrorKind::Execution);
    assert!(!action.input("n").unwrap().is_read_only());

    // validation failure
    let empty = rt.create("overwrite", Session::new()).unwrap();
    let err = empty.run(true).await.unwrap_err();
    assert_eq!(err.kind(), ActionErrorKind::Validation);
    assert_eq!(err.validation_error().unwrap().code, "required");
    assert!(!empty.input("n").unwrap().is_read_only());

    // a flag that was already set stays set
    let locked = rt.create("overwrite", Session::new()).unwrap();
    locked.set_value("n", json!(1)).unwrap();
    locked.input("n").unwrap().set_read_only(true);
    let _ = locked.run(true).await;
    assert!(locked.input("n").unwrap().is_read_only());
}

#[tokio::test]
async fn signature_is_stable_and_tracks_values() {
    let actions = ActionRegistry::new();
    actions.register_fn("echo", || Echo);
    let rt = runtime(actions);

    let first = rt.create("echo", Session::new()).unwrap();
    first.set_value("a", json!("x")).unwrap();
    let second = rt.create("echo", Session::new()).unwrap();
    second.set_value("a", json!("x")).unwrap();

    let id = first.id().await.unwrap();
    assert_eq!(first.id().await.unwrap(), id);
    assert_eq!(second.id().await.unwrap(), id);

    second.set_value("b", json!(2)).unwrap();
    assert_ne!(second.id().await.unwrap(), id);

    let anonymous = rt.handle(Arc::new(Echo), Session::new()).unwrap();
    anonymous.set_value("a", json!("x")).unwrap();
    assert!(anonymous.label().starts_with("unregistered:"));
    assert_ne!(anonymous.id().await.unwrap(), id);
}

#[tokio::test]
async fn signature_requires_valid_inputs() {
    let actions = ActionRegistry::new();
    actions.register_fn("echo", || Echo);
    let rt = runtime(actions);

    let action = rt.create("echo", Session::new()).unwrap();
    let err = action.id().await.unwrap_err();
    assert_eq!(err.kind(), ActionErrorKind::Validation);
}

struct Counted {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Action for Counted {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("key: text")]
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "key": ctx.require("key")?, "call": call }))
    }
}

#[tokio::test]
async fn cacheable_results_are_shared_within_a_session() {
    let calls = Arc::new(AtomicUsize::new(0));
    let actions = ActionRegistry::new();
    let counter = Arc::clone(&calls);
    actions.register_fn("counted", move || Counted {
        calls: Arc::clone(&counter),
    });
    let rt = runtime(actions);
    let session = Session::new();

    let run = |key: &'static str, session: Session, use_cache: bool| {
        let rt = Arc::clone(&rt);
        async move {
            let action = rt.create("counted", session).unwrap();
            action.set_value("key", json!(key)).unwrap();
            action.run(use_cache).await.unwrap()
        }
    };

    let first = run("k", session.clone(), true).await;
    let second = run("k", session.clone(), true).await;
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    run("other", session.clone(), true).await;
    run("k", session.clone(), false).await;
    run("k", Session::new(), true).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let stats = session.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(session.cache().len(), 2);
}

/// Cacheable action echoing a required and an optional text input.
struct Pair;

#[async_trait]
impl Action for Pair {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("a: text"), InputSpec::new("b?: text")]
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        Ok(json!({ "a": ctx.value("a"), "b": ctx.value("b") }))
    }
}

#[tokio::test]
async fn newlines_in_values_do_not_collide_signatures() {
    let actions = ActionRegistry::new();
    actions.register_fn("pair", || Pair);
    let rt = runtime(actions);
    let session = Session::new();

    let x = rt.create("pair", session.clone()).unwrap();
    x.set_value("a", json!("1\nb: 2")).unwrap();
    let y = rt.create("pair", session.clone()).unwrap();
    y.set_value("a", json!("1")).unwrap();
    y.set_value("b", json!("2\nb: ")).unwrap();

    assert_ne!(x.id().await.unwrap(), y.id().await.unwrap());

    x.run(true).await.unwrap();
    assert_eq!(
        y.run(true).await.unwrap(),
        json!({ "a": "1", "b": "2\nb: " })
    );
    assert_eq!(session.cache().len(), 2);
}

struct Recovering;

#[async_trait]
impl Action for Recovering {
    async fn execute(&self, _ctx: &ActionContext) -> ActionResult<Value> {
        Err(ActionError::execution("broken"))
    }

    async fn finalize(
        &self,
        _ctx: &ActionContext,
        outcome: ActionResult<Value>,
    ) -> ActionResult<Value> {
        match outcome {
            Err(err) => Ok(json!({ "recovered": err.message() })),
            ok => ok,
        }
    }
}

#[tokio::test]
async fn finalize_has_the_last_word() {
    let rt = runtime(ActionRegistry::new());
    let action = rt.handle(Arc::new(Recovering), Session::new()).unwrap();
    assert_eq!(
        action.run(true).await.unwrap(),
        json!({ "recovered": "broken" })
    );
}

/// Runs `inner` with the given value, or none.
struct Outer {
    value: Option<Value>,
}

#[async_trait]
impl Action for Outer {
    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        let inner = ctx.create_action("inner")?;
        assert_eq!(inner.origin(), Origin::Nested);
        if let Some(value) = &self.value {
            inner.set_value("n", value.clone())?;
        }
        inner.run(true).await
    }
}

struct Inner;

#[async_trait]
impl Action for Inner {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("n: numeric").with_properties(json!({ "max": 10 }))]
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        let n = ctx.require("n")?;
        if n == &json!(7) {
            return Err(ActionError::execution("unlucky"));
        }
        Ok(n.clone())
    }
}

fn nested_runtime() -> Arc<ActionRuntime> {
    let actions = ActionRegistry::new();
    actions.register_fn("outer", || Outer { value: None });
    actions.register_fn("outer-7", || Outer {
        value: Some(json!(7)),
    });
    actions.register_fn("outer-3", || Outer {
        value: Some(json!(3)),
    });
    actions.register_fn("inner", || Inner);
    runtime(actions)
}

#[tokio::test]
async fn nested_errors_carry_a_trace() {
    let rt = nested_runtime();

    let outer = rt.create("outer", Session::new()).unwrap();
    let err = outer.run(true).await.unwrap_err();
    assert_eq!(err.kind(), ActionErrorKind::Validation);
    assert_eq!(err.origin(), Some(Origin::TopLevel));
    assert_eq!(
        err.trace(),
        &["outer (top-level)".to_string(), "inner (nested)".to_string()]
    );
    assert!(err.is_nested());
    assert!(!err.is_output_enabled());

    let outer = rt.create("outer-7", Session::new()).unwrap();
    let err = outer.run(true).await.unwrap_err();
    assert_eq!(err.kind(), ActionErrorKind::Execution);
    assert!(err.is_output_enabled());

    let outer = rt.create("outer-3", Session::new()).unwrap();
    assert_eq!(outer.run(true).await.unwrap(), json!(3));
}

#[tokio::test]
async fn unknown_nested_action_is_not_found() {
    let rt = runtime(ActionRegistry::new());
    let err = rt.create("missing", Session::new()).unwrap_err();
    assert_eq!(err.code(), "ACTION_NOT_FOUND");
}

#[derive(Default)]
struct MapReader {
    values: IndexMap<String, RawValue>,
}

#[async_trait]
impl Reader for MapReader {
    async fn read(
        &self,
        _action: &ActionHandle,
        inputs: &[Arc<Input>],
    ) -> ActionResult<IndexMap<String, RawValue>> {
        Ok(inputs
            .iter()
            .filter_map(|input| {
                self.values
                    .get(input.name())
                    .map(|raw| (input.name().to_string(), raw.clone()))
            })
            .collect())
    }
}

#[derive(Default)]
struct Recorder {
    written: Mutex<Vec<Result<Value, String>>>,
}

#[async_trait]
impl Writer for Recorder {
    async fn write(&self, _action: &ActionHandle, outcome: ActionResult<Value>) -> ActionResult<()> {
        self.written
            .lock()
            .push(outcome.map_err(|err| err.to_string()));
        Ok(())
    }
}

fn handler(values: &[(&str, RawValue)]) -> (Handler, Arc<Recorder>) {
    let reader = MapReader {
        values: values
            .iter()
            .map(|(name, raw)| ((*name).to_string(), raw.clone()))
            .collect(),
    };
    let recorder = Arc::new(Recorder::default());
    let writer: Arc<dyn Writer> = recorder.clone();
    (Handler::new("cli", Arc::new(reader), writer), recorder)
}

/// Takes visible and hidden inputs.
struct Tagged;

#[async_trait]
impl Action for Tagged {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![
            InputSpec::new("tags: text[]"),
            InputSpec::new("count: numeric"),
            InputSpec::new("secret?: text").with_properties(json!({ "hidden": true })),
        ]
    }

    fn configure(&self, metadata: &mut Metadata) -> ActionResult<()> {
        metadata.set("handler.cli.readOptions.prefix", json!("--"), true)?;
        Ok(())
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        Ok(json!({
            "tags": ctx.require("tags")?,
            "count": ctx.require("count")?,
            "secret": ctx.value("secret"),
        }))
    }
}

#[tokio::test]
async fn handler_decodes_raw_values_and_writes_the_outcome() {
    let rt = runtime(ActionRegistry::new());
    let action = rt.handle(Arc::new(Tagged), Session::new()).unwrap();
    let (handler, recorder) = handler(&[
        (
            "tags",
            RawValue::List(vec!["a".to_string(), "b".to_string()]),
        ),
        ("count", RawValue::Single("3".to_string())),
        ("secret", RawValue::Single("leaked".to_string())),
    ]);

    assert_eq!(
        handler.options(&action, OptionKind::Read).unwrap(),
        Some(&json!({ "prefix": "--" }))
    );
    handler.dispatch(&action).await.unwrap();

    assert_eq!(
        *recorder.written.lock(),
        vec![Ok(json!({ "tags": ["a", "b"], "count": 3, "secret": null }))]
    );
}

#[tokio::test]
async fn scalar_inputs_reject_repeated_values() {
    let rt = runtime(ActionRegistry::new());
    let action = rt.handle(Arc::new(Tagged), Session::new()).unwrap();
    let (handler, recorder) = handler(&[
        ("tags", RawValue::Single("solo".to_string())),
        (
            "count",
            RawValue::List(vec!["1".to_string(), "2".to_string()]),
        ),
    ]);

    handler.dispatch(&action).await.unwrap();
    let written = recorder.written.lock();
    assert_eq!(written.len(), 1);
    assert!(written[0].as_ref().is_err_and(|err| err.contains("single value")));
}

#[tokio::test]
async fn handler_does_not_render_nested_validation_failures() {
    let rt = nested_runtime();
    let (handler, recorder) = handler(&[]);

    let outer = rt.create("outer", Session::new()).unwrap();
    let err = handler.dispatch(&outer).await.unwrap_err();
    assert!(matches!(err, HandlerError::Unhandled(ref inner) if inner.kind() == ActionErrorKind::Validation));
    assert!(recorder.written.lock().is_empty());

    let outer = rt.create("outer-7", Session::new()).unwrap();
    handler.dispatch(&outer).await.unwrap();
    assert_eq!(recorder.written.lock().len(), 1);
}

struct Login;

#[async_trait]
impl Action for Login {
    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::new("user: text").with_properties(json!({ "autofill": "user" }))]
    }

    async fn execute(&self, ctx: &ActionContext) -> ActionResult<Value> {
        Ok(ctx.require("user")?.clone())
    }
}

#[tokio::test]
async fn autofill_flows_between_runs_of_a_session() {
    let rt = runtime(ActionRegistry::new());
    let session = Session::new();

    let login = rt.handle(Arc::new(Login), session.clone()).unwrap();
    login.set_value("user", json!("ada")).unwrap();
    login.run(true).await.unwrap();
    assert_eq!(session.autofill("user"), Some(json!("ada")));

    let again = rt.handle(Arc::new(Login), session.clone()).unwrap();
    assert_eq!(again.run(true).await.unwrap(), json!("ada"));

    let explicit = rt.handle(Arc::new(Login), session.clone()).unwrap();
    explicit.set_value("user", json!("grace")).unwrap();
    assert_eq!(explicit.run(true).await.unwrap(), json!("grace"));
    assert_eq!(session.autofill("user"), Some(json!("grace")));

    let fresh = rt.handle(Arc::new(Login), Session::new()).unwrap();
    assert_eq!(
        fresh.run(true).await.unwrap_err().kind(),
        ActionErrorKind::Validation
    );
}
