pub mod api;

#[cfg(any(feature = "client", test))]
pub mod client;

#[cfg(any(feature = "server", test))]
pub mod app_config;

#[cfg(any(feature = "server", test))]
pub mod bookings;

#[cfg(any(feature = "server", test))]
pub mod clock;

#[cfg(any(feature = "server", test))]
pub mod error;

#[cfg(any(feature = "server", test))]
mod handlers;

#[cfg(any(feature = "server", test))]
pub mod repository;

#[cfg(any(feature = "server", test))]
pub mod service;

#[cfg(any(feature = "server", test))]
pub mod settings;
