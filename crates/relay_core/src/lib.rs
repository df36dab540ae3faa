//! Cross-context message routing: command tables, routers, the in-process bus,
//! overlay lifecycle and the scripts that run on each surface.

pub mod bus;
pub mod document;
pub mod inject;
pub mod overlay;
pub mod router;
pub mod scripts;
pub mod table;
pub mod transport;

pub use bus::{Bus, Endpoint, Envelope};
pub use document::{Document, ImageElement};
pub use inject::{overlay_page, Injector, Script, ScriptEnv, ScriptRegistry};
pub use overlay::{OverlayHandle, OverlayHost, OverlayManager, OverlaySpec};
pub use router::{ForwardPolicy, RouteOutcome, Router};
pub use table::{CommandTable, Dispatch, Invocation, OneShotState, Responder};
pub use transport::Transport;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
