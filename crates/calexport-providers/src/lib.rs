//! Collaborators of an export run and their implementations.
//!
//! - [`Authenticator`] - obtains a credential and the signed-in user's address
//! - [`EventSource`] - lists raw events for a time window
//! - [`CalendarWriter`] - persists calendar entries
//! - [`ProviderError`] - error type shared by the above
//!
//! ```text
//!  Authenticator ──credential──▶ EventSource ──RawEvent──▶ (filter, transcode)
//!                                                              │
//!                                              CalendarEntry   ▼
//!                                                        CalendarWriter ──▶ .ics
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod ics;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use ics::{IcsFileWriter, render_calendar};
pub use provider::{Authenticator, BoxFuture, CalendarWriter, Credential, EventSource};
