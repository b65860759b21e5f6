//! Typed entities returned by the remote API.

pub mod activity;
pub mod alliance;
pub mod id;
pub mod identifier;
pub mod nation;
pub mod time;
pub mod trade;
pub mod treaty;
pub mod war;

pub use activity::{ActivityFilter, MissingActivity};
pub use alliance::{Alliance, AllianceRef};
pub use id::{AllianceId, NationId, TreatyId, WarId};
pub use identifier::{Resolution, ResolvedIdentifier, Strategy};
pub use nation::{City, Nation, NationLookup, NationSummary};
pub use trade::{Resource, TradePrice, TradePriceRow};
pub use treaty::Treaty;
pub use war::{War, WarAttack};
