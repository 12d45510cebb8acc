//! Playground binary.
//!
//! Runs a server pass and a client pass in one process: the server pass
//! materializes the sample view-models, drives their lifecycle and writes the
//! hydration payload; the client pass hydrates fresh stores from that payload.
//!
//! ```bash
//! RUST_LOG=mvvm=debug cargo run -p mvvm-playground
//! ```
mod services;
mod view_models;

use std::sync::Arc;

use anyhow::Result;
use mvvm_core::{HydrationPayload, LifecycleEvent};
use mvvm_runtime::{Container, HostEvents, MvvmConfig, MvvmContext, RenderPass, VmScope};
use serde_json::json;

use services::{ErrorService, LoggerService, SendingService};
use view_models::{Counter, Greeter, RootScreen};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MvvmConfig::from_env();
    let container = Arc::new(build_container());

    let payload = server_pass(&container, config.clone()).await?;
    println!("{}", payload.to_json()?);

    client_pass(
        &container,
        MvvmConfig {
            pass: RenderPass::Client,
            ..config
        },
        payload,
    )?;
    Ok(())
}

fn build_container() -> Container {
    let mut container = Container::new();
    container
        .register_instance(Arc::new(LoggerService))
        .register_instance(Arc::new(SendingService::default()))
        .register_instance(Arc::new(ErrorService::default()))
        .register_view_model::<RootScreen>(VmScope::Screen)
        .register_view_model::<Counter>(VmScope::Component)
        .register_view_model::<Greeter>(VmScope::Component);
    container
}

async fn server_pass(container: &Arc<Container>, config: MvvmConfig) -> Result<HydrationPayload> {
    tracing::info!("Starting server pass");
    let ctx = MvvmContext::builder()
        .config(config)
        .container(container.clone())
        .build();
    let writer = ctx.spawn_payload_writer();

    let host = HostEvents::new();
    let screen = ctx.use_vm::<RootScreen>(&host)?;
    let counter = ctx.use_vm::<Counter>(&host)?;
    let greeter = ctx.use_vm::<Greeter>(&host)?;

    let prefetched = host.emit_async(LifecycleEvent::ServerPrefetch, &[]).await?;
    tracing::info!("Prefetched: {:?}", prefetched);
    host.emit(LifecycleEvent::BeforeMount, &[])?;
    host.emit(LifecycleEvent::Mounted, &[])?;

    counter.call("increment", &[])?;
    greeter.call("rename", &[json!("server")])?;
    let sent = screen.call_async("submit", &[json!("hello")]).await?;
    tracing::info!("Submit finished: {}", sent);
    if let Err(e) = screen.call_async("submit", &[]).await {
        tracing::warn!("Submit failed: {}", e);
    }
    tracing::info!("Last error: {}", screen.derived("last_error")?);

    // Children reuse the root stores.
    let child = ctx.use_child_vm::<Counter>()?;
    child.call("increment", &[])?;

    let payload = match writer {
        Some(writer) => {
            writer.shutdown().await;
            ctx.payload()?
        }
        None => ctx.capture_payload()?,
    };

    host.emit(LifecycleEvent::Unmounted, &[])?;
    tracing::info!("Server pass finished with {} stores", payload.len());
    Ok(payload)
}

fn client_pass(container: &Arc<Container>, config: MvvmConfig, payload: HydrationPayload) -> Result<()> {
    tracing::info!("Starting client pass");
    let ctx = MvvmContext::builder()
        .config(config)
        .container(container.clone())
        .payload(payload)
        .build();

    let host = HostEvents::new();
    let screen = ctx.use_vm::<RootScreen>(&host)?;
    let counter = ctx.use_vm::<Counter>(&host)?;
    let greeter = ctx.use_vm::<Greeter>(&host)?;
    host.emit(LifecycleEvent::Mounted, &[])?;

    println!(
        "client: counter = {}, screen.counter = {}, greeting = {}",
        counter.value("count")?.unwrap_or_default(),
        screen.value("counter")?.unwrap_or_default(),
        greeter.derived("greeting")?,
    );

    host.emit(LifecycleEvent::Unmounted, &[])?;
    Ok(())
}
