//! Usage: Outbound side of auth: the identity backend seam, popup providers, and the REST adapter.

pub(crate) mod backend_trait;
pub(crate) mod oauth;
pub(crate) mod observers;
pub(crate) mod rest;

pub use backend_trait::{BackendFuture, IdentityBackend, SignInMethod};
pub use observers::{SessionListener, SessionObservers, Subscription};
pub use rest::IdentityToolkitBackend;
