//! View-models shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mvvm_core::{
    ActionContext, ActionError, Dependencies, Fields, OnErrorCaptured, OnMounted,
    OnServerPrefetch, OnSetup, OnUnmounted, Outcome, ResolveError, SchemaBuilder, TokenDescriptor,
    Value, ViewModel,
};
use mvvm_runtime::{Container, MvvmConfig, MvvmContext};
use serde_json::json;

/// Plain counter with one action and one getter.
pub struct Counter {
    count: i64,
}

impl ViewModel for Counter {
    const NAME: &'static str = "Counter";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self { count: 0 })
    }

    fn fields(self) -> Fields {
        Fields::new().data("count", self.count)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder
            .getter("double", |state| json!(state.i64("count").unwrap_or(0) * 2))
            .action("increment", |ctx, _args| {
                let count = ctx.state().i64("count")?;
                ctx.set("count", count + 1);
                Ok(Value::Null)
            });
    }
}

/// Records every message it is asked to log.
#[derive(Debug, Default)]
pub struct Logger {
    lines: Mutex<Vec<String>>,
}

impl Logger {
    pub fn log(&self, line: impl Into<String>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.into());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

/// A view-model with one injected service and one plain field.
pub struct Greeter {
    logger: Arc<Logger>,
    name: String,
}

impl ViewModel for Greeter {
    const NAME: &'static str = "Greeter";

    fn dependencies() -> Vec<TokenDescriptor> {
        vec![TokenDescriptor::of::<Logger>()]
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self {
            logger: deps.take::<Logger>(0)?,
            name: String::from("a"),
        })
    }

    fn fields(self) -> Fields {
        Fields::new()
            .object("logger", self.logger)
            .data("name", self.name)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder
            .getter("greeting", |state| {
                json!(format!("hello, {}", state.str("name").unwrap_or_default()))
            })
            .action("greet", |ctx, _args| {
                let logger = ctx.require_service::<Logger>("logger")?;
                let greeting = ctx.derived("greeting").unwrap_or(Value::Null);
                logger.log(greeting.as_str().unwrap_or_default());
                Ok(greeting)
            });
    }
}

/// Profile with defaults that hydration may override, including falsy ones.
pub struct Profile;

impl ViewModel for Profile {
    const NAME: &'static str = "Profile";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self)
    }

    fn fields(self) -> Fields {
        Fields::new()
            .data("x", 10)
            .data("visits", 3)
            .data("nickname", "guest")
    }

    fn schema(_builder: &mut SchemaBuilder) {}
}

/// Declares several lifecycle capabilities and records their invocations in
/// its `calls` field.
pub struct Widget;

impl Widget {
    fn record(ctx: &mut ActionContext<'_>, hook: &str, args: &[Value]) -> Result<(), ActionError> {
        let mut calls = ctx
            .value("calls")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        calls.push(json!({ "hook": hook, "args": args }));
        ctx.set("calls", calls);
        Ok(())
    }
}

impl ViewModel for Widget {
    const NAME: &'static str = "Widget";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self)
    }

    fn fields(self) -> Fields {
        Fields::new()
            .data("calls", Vec::<Value>::new())
            .data("ready", false)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder
            .on_setup::<Self>()
            .on_mounted::<Self>()
            .on_unmounted::<Self>()
            .on_error_captured::<Self>()
            // Named like a hook but not declared as a capability.
            .action("on_updated", |ctx, args| {
                Widget::record(ctx, "on_updated", args)?;
                Ok(Value::Null)
            })
            .action("explode", |_, _| Err(ActionError::failed("widget exploded")));
    }
}

impl OnSetup for Widget {
    fn on_setup(ctx: &mut ActionContext<'_>, args: &[Value]) -> Result<Outcome, ActionError> {
        ctx.set("ready", true);
        Widget::record(ctx, "on_setup", args)?;
        Ok(Outcome::done())
    }
}

impl OnMounted for Widget {
    fn on_mounted(ctx: &mut ActionContext<'_>, args: &[Value]) -> Result<Outcome, ActionError> {
        if args.first().and_then(Value::as_str) == Some("fail") {
            return Err(ActionError::failed("mount failed"));
        }
        Widget::record(ctx, "on_mounted", args)?;
        Ok(Outcome::done())
    }
}

impl OnUnmounted for Widget {
    fn on_unmounted(ctx: &mut ActionContext<'_>, args: &[Value]) -> Result<Outcome, ActionError> {
        Widget::record(ctx, "on_unmounted", args)?;
        Ok(Outcome::done())
    }
}

impl OnErrorCaptured for Widget {
    fn on_error_captured(ctx: &mut ActionContext<'_>, args: &[Value]) -> Result<Outcome, ActionError> {
        Widget::record(ctx, "on_error_captured", args)?;
        Ok(Outcome::done())
    }
}

/// Source of data for [`Catalog`]'s server prefetch.
#[derive(Debug)]
pub struct CatalogApi {
    pub items: Vec<&'static str>,
    pub fail: bool,
}

/// Fetches its items asynchronously during the server pass.
pub struct Catalog {
    api: Arc<CatalogApi>,
}

impl ViewModel for Catalog {
    const NAME: &'static str = "Catalog";

    fn dependencies() -> Vec<TokenDescriptor> {
        vec![TokenDescriptor::of::<CatalogApi>()]
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self {
            api: deps.take::<CatalogApi>(0)?,
        })
    }

    fn fields(self) -> Fields {
        Fields::new()
            .object("api", self.api)
            .data("items", Vec::<Value>::new())
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder.on_server_prefetch::<Self>();
    }
}

impl OnServerPrefetch for Catalog {
    fn on_server_prefetch(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        let api = ctx.require_service::<CatalogApi>("api")?;
        Ok(Outcome::pending(async move {
            tokio::task::yield_now().await;
            if api.fail {
                return Err(ActionError::failed("catalog unavailable"));
            }
            Ok(json!(api.items))
        }))
    }
}

/// Makes the next `remaining` setups fail.
#[derive(Debug)]
pub struct SetupGate {
    remaining: AtomicUsize,
}

impl SetupGate {
    pub fn failing(times: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(times),
        }
    }

    fn should_fail(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Counts its setups in `n`; setup fails while its gate says so.
pub struct GatedSetup {
    gate: Arc<SetupGate>,
}

impl ViewModel for GatedSetup {
    const NAME: &'static str = "GatedSetup";

    fn dependencies() -> Vec<TokenDescriptor> {
        vec![TokenDescriptor::of::<SetupGate>()]
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self {
            gate: deps.take::<SetupGate>(0)?,
        })
    }

    fn fields(self) -> Fields {
        Fields::new().object("gate", self.gate).data("n", 0)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder.on_setup::<Self>();
    }
}

impl OnSetup for GatedSetup {
    fn on_setup(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        let n = ctx.state().i64("n")?;
        ctx.set("n", n + 1);
        if ctx.require_service::<SetupGate>("gate")?.should_fail() {
            return Err(ActionError::failed("setup failed"));
        }
        Ok(Outcome::done())
    }
}

/// Setup that tries to defer its work.
pub struct DeferredSetup;

impl ViewModel for DeferredSetup {
    const NAME: &'static str = "DeferredSetup";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self)
    }

    fn fields(self) -> Fields {
        Fields::new().data("loaded", false)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder.on_setup::<Self>();
    }
}

impl OnSetup for DeferredSetup {
    fn on_setup(_ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        Ok(Outcome::pending(async { Ok(Value::Bool(true)) }))
    }
}

/// Unmount hook that always fails.
pub struct BrokenUnmount;

impl ViewModel for BrokenUnmount {
    const NAME: &'static str = "BrokenUnmount";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self)
    }

    fn fields(self) -> Fields {
        Fields::new().data("open", true)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder.on_unmounted::<Self>();
    }
}

impl OnUnmounted for BrokenUnmount {
    fn on_unmounted(_ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        Err(ActionError::failed("unmount failed"))
    }
}

/// Not a registered service, so never flagged as injected.
#[derive(Debug)]
pub struct Clock;

/// Holds a live object that is not an injected dependency.
pub struct Ticker;

impl ViewModel for Ticker {
    const NAME: &'static str = "Ticker";

    fn construct(_deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self)
    }

    fn fields(self) -> Fields {
        Fields::new().object("clock", Arc::new(Clock)).data("ticks", 0)
    }

    fn schema(_builder: &mut SchemaBuilder) {}
}

pub fn container() -> Arc<Container> {
    let mut container = Container::new();
    container
        .register_instance(Arc::new(Logger::default()))
        .register_instance(Arc::new(CatalogApi {
            items: vec!["apple", "pear"],
            fail: false,
        }))
        .register_instance(Arc::new(SetupGate::failing(1)));
    Arc::new(container)
}

pub fn server_context() -> MvvmContext {
    MvvmContext::builder()
        .config(MvvmConfig::server())
        .container(container())
        .build()
}
