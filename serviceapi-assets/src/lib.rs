//! serviceapi-assets - Asset and indicator read model
//!
//! Assets are owned by an operator/team pair and annotated with indicators
//! reported by external event sources. Lookups return assets together with
//! their owner and indicators.

pub mod db;

pub use db::assets::{get_asset, get_asset_hostname, indicators_from_event_source};
pub use db::indicators::{delete_asset, parse_indicators, record_indicator, NewIndicator};
pub use db::owners::{ensure_asset_group, ensure_owner, set_asset_group, set_asset_owner};
