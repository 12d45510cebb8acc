//! Runtime configuration and its environment loader.
use std::env;

/// Which side of the server/client boundary the context runs on.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RenderPass {
    /// Produces the hydration payload.
    #[default]
    Server,
    /// Consumes the hydration payload.
    Client,
}

/// Configuration shared by a context, its factory and its payload writer.
#[derive(Clone, Debug)]
pub struct MvvmConfig {
    pub pass: RenderPass,
    /// Let a child materialization build a missing shape instead of failing.
    pub lazy_child_shapes: bool,
    /// Drop a class's cached shape when its root store is torn down.
    pub evict_on_dispose: bool,
    /// Capacity of each store's change channel and of the registry feed.
    pub change_buffer_size: usize,
}

impl Default for MvvmConfig {
    fn default() -> Self {
        Self {
            pass: RenderPass::Server,
            lazy_child_shapes: false,
            evict_on_dispose: false,
            change_buffer_size: 64,
        }
    }
}

impl MvvmConfig {
    pub fn server() -> Self {
        Self::default()
    }

    pub fn client() -> Self {
        Self {
            pass: RenderPass::Client,
            ..Self::default()
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MVVM_RENDER_PASS` - `server` or `client` (default: server)
    /// - `MVVM_LAZY_CHILD_SHAPES` - Build shapes for orphan child view-models (default: false)
    /// - `MVVM_EVICT_ON_DISPOSE` - Evict shapes on root teardown (default: false)
    /// - `MVVM_CHANGE_BUFFER` - Change channel capacity (default: 64)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(pass) = read_env::<RenderPass>("MVVM_RENDER_PASS") {
            config.pass = pass;
        }

        if let Some(lazy) = read_env::<bool>("MVVM_LAZY_CHILD_SHAPES") {
            config.lazy_child_shapes = lazy;
        }

        if let Some(evict) = read_env::<bool>("MVVM_EVICT_ON_DISPOSE") {
            config.evict_on_dispose = evict;
        }

        if let Some(capacity) = read_env::<usize>("MVVM_CHANGE_BUFFER") {
            config.change_buffer_size = capacity.max(1);
        }

        config
    }

    pub fn is_server(&self) -> bool {
        self.pass == RenderPass::Server
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
