//! Sample view-models rendered by the playground.
use std::sync::Arc;
use std::time::Duration;

use mvvm_core::{
    ActionContext, ActionError, Dependencies, Fields, OnMounted, OnServerPrefetch, OnSetup,
    OnUnmounted, Outcome, ResolveError, SchemaBuilder, TokenDescriptor, Value, ViewModel,
};
use serde_json::json;

use crate::services::{ErrorService, LoggerService, SendingService};

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
        builder.action("increment", |ctx, _| {
            let count = ctx.state().i64("count")?;
            ctx.set("count", count + 1);
            Ok(Value::Null)
        });
    }
}

pub struct Greeter {
    logger: Arc<LoggerService>,
    name: String,
}

impl ViewModel for Greeter {
    const NAME: &'static str = "Greeter";

    fn dependencies() -> Vec<TokenDescriptor> {
        vec![TokenDescriptor::of::<LoggerService>()]
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self {
            logger: deps.take::<LoggerService>(0)?,
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
            .action("rename", |ctx, args| {
                let name = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| ActionError::InvalidArgument {
                        index: 0,
                        message: String::from("expected a name"),
                    })?
                    .to_string();
                ctx.set("name", name);
                Ok(Value::Null)
            });
    }
}

/// Screen-level view-model with a simulated submit.
pub struct RootScreen {
    logger: Arc<LoggerService>,
    sending: Arc<SendingService>,
    error: Arc<ErrorService>,
    counter: i64,
}

const SUBMIT_KEY: &str = "default";

impl ViewModel for RootScreen {
    const NAME: &'static str = "RootScreen";

    fn dependencies() -> Vec<TokenDescriptor> {
        vec![
            TokenDescriptor::of::<LoggerService>(),
            TokenDescriptor::of::<SendingService>(),
            TokenDescriptor::of::<ErrorService>(),
        ]
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, ResolveError> {
        Ok(Self {
            logger: deps.take::<LoggerService>(0)?,
            sending: deps.take::<SendingService>(1)?,
            error: deps.take::<ErrorService>(2)?,
            counter: 0,
        })
    }

    fn fields(self) -> Fields {
        Fields::new()
            .data("counter", self.counter)
            .object("logger", self.logger)
            .object("sending", self.sending)
            .object("error", self.error)
    }

    fn schema(builder: &mut SchemaBuilder) {
        builder
            .getter("is_sending", |state| {
                let sending = state
                    .service::<SendingService>("sending")
                    .is_some_and(|sending| sending.is_sending(SUBMIT_KEY));
                Value::Bool(sending)
            })
            .action("set_counter", |ctx, _| {
                ctx.set("counter", 2);
                Ok(Value::Null)
            })
            .action("increment", |ctx, _| {
                let counter = ctx.state().i64("counter")?;
                ctx.set("counter", counter + 1);
                Ok(Value::Null)
            })
            .getter("last_error", |state| {
                state
                    .service::<ErrorService>("error")
                    .and_then(|error| error.last())
                    .map_or(Value::Null, Value::String)
            })
            .operation("submit", |ctx, args| {
                let sending = ctx.require_service::<SendingService>("sending")?;
                let error = ctx.require_service::<ErrorService>("error")?;
                let message = args.first().and_then(Value::as_str).map(str::to_string);
                sending.begin(SUBMIT_KEY);
                Ok(Outcome::pending(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let sent = match message {
                        Some(message) => Ok(json!(format!("sent: {message}"))),
                        None => Err(ActionError::failed("nothing to send")),
                    };
                    sending.end(SUBMIT_KEY);
                    if let Err(err) = &sent {
                        error.setup(err.to_string());
                    }
                    sent
                }))
            })
            .on_setup::<Self>()
            .on_mounted::<Self>()
            .on_unmounted::<Self>()
            .on_server_prefetch::<Self>();
    }
}

impl OnSetup for RootScreen {
    fn on_setup(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        ctx.call("set_counter", &[])
    }
}

impl OnMounted for RootScreen {
    fn on_mounted(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        let logger = ctx.require_service::<LoggerService>("logger")?;
        logger.info(&format!("root screen mounted, counter = {}", ctx.state().i64("counter")?));
        Ok(Outcome::done())
    }
}

impl OnUnmounted for RootScreen {
    fn on_unmounted(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        let logger = ctx.require_service::<LoggerService>("logger")?;
        logger.info("root screen unmounted");
        Ok(Outcome::done())
    }
}

impl OnServerPrefetch for RootScreen {
    fn on_server_prefetch(ctx: &mut ActionContext<'_>, _args: &[Value]) -> Result<Outcome, ActionError> {
        ctx.call("increment", &[])?;
        let counter = ctx.state().i64("counter")?;
        Ok(Outcome::pending(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(json!({ "prefetched_counter": counter }))
        }))
    }
}
