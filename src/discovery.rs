//! Link-time handler discovery.
//!
//! Handler modules can announce their registrations at link time instead of
//! wiring every one through the builder by hand. Each submission names an
//! install function; when [`Config::auto_discover`](crate::Config) is set,
//! `build()` runs every collected entry before freezing the registry.
//!
//! Duplicate submissions are not deduplicated: two entries registering a
//! handler for the same command type surface as an ambiguous-handler build
//! error, and two entries subscribing the same event type both fan out.

use tracing::info;

use crate::facade::HeraldBuilder;

/// A registration collected at link time.
///
/// ```ignore
/// inventory::submit! {
///     Discovered::new("billing::ChargeHandler", |builder| {
///         builder.command_handler(ChargeHandler::default())
///     })
/// }
/// ```
pub struct Discovered {
    name: &'static str,
    install: fn(HeraldBuilder) -> HeraldBuilder,
}

impl Discovered {
    /// Describe a registration: a display name for logs and the install
    /// function applied at build time.
    pub const fn new(name: &'static str, install: fn(HeraldBuilder) -> HeraldBuilder) -> Self {
        Self { name, install }
    }

    /// Display name of this registration.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

inventory::collect!(Discovered);

/// Apply every collected registration to `builder`.
pub(crate) fn install_all(mut builder: HeraldBuilder) -> HeraldBuilder {
    for entry in inventory::iter::<Discovered> {
        info!(registration = %entry.name, "Installing discovered registration");
        builder = (entry.install)(builder);
    }
    builder
}
