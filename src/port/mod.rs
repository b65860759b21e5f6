//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!            feature modules (dashboards, comparisons, recruitment)
//!                               │
//!                               ▼
//!                    ┌─────────────────────┐
//!                    │ inbound::DataGateway│
//!                    └──────────┬──────────┘
//!                               │  application::Gateway
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!  ┌────────────────┐   ┌──────────────┐     ┌─────────────┐
//!  │GraphqlTransport│   │ RecordStore  │     │    Clock    │
//!  └────────────────┘   └──────────────┘     └─────────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::gateway::{DataGateway, EntityKey, EntityPayload, FetchOptions};
pub use outbound::clock::{Clock, SystemClock};
pub use outbound::store::RecordStore;
pub use outbound::transport::{GraphqlEnvelope, GraphqlError, GraphqlTransport};
