//! Host lifecycle events and the capability traits view-models opt into.
//!
//! A view-model declares which lifecycle events it reacts to by implementing
//! the matching capability trait and registering it in its schema, e.g.
//! `builder.on_mounted::<Self>()`. Registration stores the hook as an
//! operation under [`LifecycleEvent::hook_name`] and sets the event's
//! [`LifecycleCaps`] bit; the bridge only dispatches events whose bit is set.
use bitflags::bitflags;

use crate::error::ActionError;
use crate::schema::{ActionContext, Outcome, SchemaBuilder};
use crate::state::Value;

/// Lifecycle events a store can react to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LifecycleEvent {
    /// Fired once right after store construction; never comes from the host.
    Setup,
    BeforeMount,
    Mounted,
    BeforeUnmount,
    /// The view was detached. Tears the store down after the hook runs.
    Unmounted,
    ErrorCaptured,
    Updated,
    RenderTracked,
    RenderTriggered,
    Activated,
    Deactivated,
    /// May return a pending outcome the host awaits before finishing the server pass.
    ServerPrefetch,
    BeforeRouteLeave,
    BeforeRouteUpdate,
}

impl LifecycleEvent {
    /// Events the bridge subscribes to on the host, in subscription order.
    pub const HOST_EVENTS: [LifecycleEvent; 13] = [
        LifecycleEvent::Mounted,
        LifecycleEvent::Unmounted,
        LifecycleEvent::BeforeMount,
        LifecycleEvent::BeforeUnmount,
        LifecycleEvent::ErrorCaptured,
        LifecycleEvent::Updated,
        LifecycleEvent::RenderTracked,
        LifecycleEvent::RenderTriggered,
        LifecycleEvent::Activated,
        LifecycleEvent::Deactivated,
        LifecycleEvent::ServerPrefetch,
        LifecycleEvent::BeforeRouteLeave,
        LifecycleEvent::BeforeRouteUpdate,
    ];

    /// Name of the store operation invoked for this event.
    pub const fn hook_name(self) -> &'static str {
        match self {
            LifecycleEvent::Setup => "on_setup",
            LifecycleEvent::BeforeMount => "on_before_mount",
            LifecycleEvent::Mounted => "on_mounted",
            LifecycleEvent::BeforeUnmount => "on_before_unmount",
            LifecycleEvent::Unmounted => "on_unmounted",
            LifecycleEvent::ErrorCaptured => "on_error_captured",
            LifecycleEvent::Updated => "on_updated",
            LifecycleEvent::RenderTracked => "on_render_tracked",
            LifecycleEvent::RenderTriggered => "on_render_triggered",
            LifecycleEvent::Activated => "on_activated",
            LifecycleEvent::Deactivated => "on_deactivated",
            LifecycleEvent::ServerPrefetch => "on_server_prefetch",
            LifecycleEvent::BeforeRouteLeave => "on_before_route_leave",
            LifecycleEvent::BeforeRouteUpdate => "on_before_route_update",
        }
    }

    pub const fn capability(self) -> LifecycleCaps {
        match self {
            LifecycleEvent::Setup => LifecycleCaps::SETUP,
            LifecycleEvent::BeforeMount => LifecycleCaps::BEFORE_MOUNT,
            LifecycleEvent::Mounted => LifecycleCaps::MOUNTED,
            LifecycleEvent::BeforeUnmount => LifecycleCaps::BEFORE_UNMOUNT,
            LifecycleEvent::Unmounted => LifecycleCaps::UNMOUNTED,
            LifecycleEvent::ErrorCaptured => LifecycleCaps::ERROR_CAPTURED,
            LifecycleEvent::Updated => LifecycleCaps::UPDATED,
            LifecycleEvent::RenderTracked => LifecycleCaps::RENDER_TRACKED,
            LifecycleEvent::RenderTriggered => LifecycleCaps::RENDER_TRIGGERED,
            LifecycleEvent::Activated => LifecycleCaps::ACTIVATED,
            LifecycleEvent::Deactivated => LifecycleCaps::DEACTIVATED,
            LifecycleEvent::ServerPrefetch => LifecycleCaps::SERVER_PREFETCH,
            LifecycleEvent::BeforeRouteLeave => LifecycleCaps::BEFORE_ROUTE_LEAVE,
            LifecycleEvent::BeforeRouteUpdate => LifecycleCaps::BEFORE_ROUTE_UPDATE,
        }
    }

    /// Whether the host's delivery of this event detaches the view.
    pub const fn is_teardown(self) -> bool {
        matches!(self, LifecycleEvent::Unmounted)
    }
}

bitflags! {
    /// Lifecycle capabilities implemented by a view-model.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct LifecycleCaps: u16 {
        const SETUP               = 1 << 0;
        const BEFORE_MOUNT        = 1 << 1;
        const MOUNTED             = 1 << 2;
        const BEFORE_UNMOUNT      = 1 << 3;
        const UNMOUNTED           = 1 << 4;
        const ERROR_CAPTURED      = 1 << 5;
        const UPDATED             = 1 << 6;
        const RENDER_TRACKED      = 1 << 7;
        const RENDER_TRIGGERED    = 1 << 8;
        const ACTIVATED           = 1 << 9;
        const DEACTIVATED         = 1 << 10;
        const SERVER_PREFETCH     = 1 << 11;
        const BEFORE_ROUTE_LEAVE  = 1 << 12;
        const BEFORE_ROUTE_UPDATE = 1 << 13;
    }
}

macro_rules! lifecycle_capabilities {
    ($(
        $(#[$doc:meta])*
        $event:ident => $capability:ident :: $method:ident;
    )*) => {
        $(
            $(#[$doc])*
            pub trait $capability {
                fn $method(ctx: &mut ActionContext<'_>, args: &[Value]) -> Result<Outcome, ActionError>;
            }
        )*

        impl SchemaBuilder {
            $(
                #[doc = concat!("Registers [`", stringify!($capability), "`] for this view-model.")]
                pub fn $method<T: $capability>(&mut self) -> &mut Self {
                    self.hook(LifecycleEvent::$event, |ctx, args| T::$method(ctx, args))
                }
            )*
        }
    };
}

lifecycle_capabilities! {
    /// Runs once, synchronously, right after the root store is created.
    Setup => OnSetup::on_setup;
    BeforeMount => OnBeforeMount::on_before_mount;
    Mounted => OnMounted::on_mounted;
    BeforeUnmount => OnBeforeUnmount::on_before_unmount;
    /// Runs before the store is removed from the registry and disposed.
    Unmounted => OnUnmounted::on_unmounted;
    /// Receives the host-supplied error description as its first argument.
    ErrorCaptured => OnErrorCaptured::on_error_captured;
    Updated => OnUpdated::on_updated;
    RenderTracked => OnRenderTracked::on_render_tracked;
    RenderTriggered => OnRenderTriggered::on_render_triggered;
    Activated => OnActivated::on_activated;
    Deactivated => OnDeactivated::on_deactivated;
    /// Usually returns [`Outcome::Pending`]; the host awaits it.
    ServerPrefetch => OnServerPrefetch::on_server_prefetch;
    BeforeRouteLeave => OnBeforeRouteLeave::on_before_route_leave;
    BeforeRouteUpdate => OnBeforeRouteUpdate::on_before_route_update;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_host_events_exclude_setup() {
        assert!(!LifecycleEvent::HOST_EVENTS.contains(&LifecycleEvent::Setup));
        assert_eq!(
            LifecycleEvent::HOST_EVENTS.len(),
            LifecycleEvent::iter().count() - 1
        );
    }

    #[test]
    fn test_capabilities_are_distinct() {
        let mut all = LifecycleCaps::empty();
        for event in LifecycleEvent::iter() {
            assert!(!all.intersects(event.capability()), "{event} overlaps");
            all |= event.capability();
        }
        assert_eq!(all, LifecycleCaps::all());
    }

    #[test]
    fn test_names_round_trip_through_strum() {
        assert_eq!(LifecycleEvent::ServerPrefetch.to_string(), "server_prefetch");
        assert_eq!(
            LifecycleEvent::from_str("before_route_leave").unwrap(),
            LifecycleEvent::BeforeRouteLeave
        );
        assert_eq!(LifecycleEvent::Mounted.hook_name(), "on_mounted");
    }

    #[test]
    fn test_only_unmounted_tears_down() {
        let teardown: Vec<_> = LifecycleEvent::iter().filter(|e| e.is_teardown()).collect();
        assert_eq!(teardown, vec![LifecycleEvent::Unmounted]);
    }
}
