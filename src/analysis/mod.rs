//! Analysis stages.
//!
//! - elasticity estimation per group (`elasticity`)
//! - yearly trend forecasting (`forecast`)
//! - competitor benchmark aggregation (`benchmark`)
//! - bounded price recommendation (`pricing`)
//!
//! Every stage is a pure function of its inputs; reports are returned by value
//! and passed by reference to later stages.

pub mod benchmark;
pub mod elasticity;
pub mod forecast;
pub mod groups;
pub mod pricing;

pub use benchmark::aggregate as aggregate_benchmarks;
pub use elasticity::{ElasticityOptions, estimate as estimate_elasticity};
pub use forecast::{ForecastOptions, ValueDomain, forecast};
pub use pricing::{PricingOptions, recommend as recommend_prices};
