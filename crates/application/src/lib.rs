//! zonemux Application Layer
//!
//! Query routing, plugin chains and DSO sessions. Sockets live in the
//! infrastructure crate; this crate only sees decoded requests and the
//! [`ports::ResponseWriter`] they are answered through.
pub mod context;
pub mod dso;
pub mod errors;
pub mod ports;
pub mod request;
pub mod services;
pub mod use_cases;

pub use context::RequestContext;
pub use errors::{client_wrote, PluginError};
pub use request::{Protocol, Request, RequestKind, TsigStatus};
