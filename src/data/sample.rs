//! Seeded synthetic sales data with known elasticities.
//!
//! Each brand gets a true elasticity `e` and a base price. Rows are drawn as
//!
//! `ln(volume) = a + e * ln(price) + noise`
//!
//! with `a` chosen so volume is about 1000 units at the base price. The last
//! brand is deliberately sparse (two rows, one year) so a demo run exercises
//! the fallback paths of the recommender.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CleanedTable, SALES_VOLUME, SalesRecord};
use crate::error::AppError;

const BRANDS: [&str; 8] = [
    "Burberry", "Cartier", "Chanel", "Dior", "Fendi", "Gucci", "Hermes", "Prada",
];

/// Units sold at the base price.
const BASE_VOLUME: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub brands: usize,
    pub first_year: i32,
    pub years: usize,
    pub rows_per_year: usize,
    pub seed: u64,
    /// Standard deviation of the log-volume noise.
    pub noise_sd: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            brands: 5,
            first_year: 2018,
            years: 6,
            rows_per_year: 4,
            seed: 42,
            noise_sd: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleData {
    /// Own-brand sales rows.
    pub table: CleanedTable,
    /// Competitor price observations keyed by the brand they compete with.
    pub competitors: CleanedTable,
    /// Elasticity used to generate each brand.
    pub true_elasticity: BTreeMap<String, f64>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData, AppError> {
    if config.brands == 0 || config.brands > BRANDS.len() {
        return Err(AppError::new(
            2,
            format!("Sample brand count must be in 1..={}.", BRANDS.len()),
        ));
    }
    if config.years == 0 || config.rows_per_year == 0 {
        return Err(AppError::new(2, "Sample years and rows per year must be > 0."));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::new(2, "Sample noise must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let volume_noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let price_noise = Normal::<f64>::new(0.0, 0.15)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let competitor_noise = Normal::<f64>::new(0.0, 0.10)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::new();
    let mut competitors = Vec::new();
    let mut true_elasticity = BTreeMap::new();

    for (b, &brand) in BRANDS.iter().take(config.brands).enumerate() {
        let elasticity = rng.gen_range(-2.5..-0.3);
        let base_price: f64 = rng.gen_range(80.0..400.0);
        let drift = rng.gen_range(0.0..0.06);
        let intercept = BASE_VOLUME.ln() - elasticity * base_price.ln();
        true_elasticity.insert(brand.to_string(), elasticity);

        let sparse = config.brands >= 3 && b + 1 == config.brands;
        let (years, per_year) = if sparse { (1, 2) } else { (config.years, config.rows_per_year) };

        for y in 0..years {
            let year = config.first_year + y as i32;
            let level = base_price * (1.0 + drift * y as f64);

            let mut year_prices = Vec::with_capacity(per_year);
            for _ in 0..per_year {
                let price = level * price_noise.sample(&mut rng).exp();
                let log_volume = intercept + elasticity * price.ln() + volume_noise.sample(&mut rng);
                rows.push(SalesRecord::new(brand, year, round2(price)).with_volume(log_volume.exp().round()));
                year_prices.push(price);
            }

            let mean_price = year_prices.iter().sum::<f64>() / year_prices.len() as f64;
            let n_competitors = rng.gen_range(3..=6);
            for _ in 0..n_competitors {
                let skew = rng.gen_range(0.85..1.2);
                let price = mean_price * skew * competitor_noise.sample(&mut rng).exp();
                competitors.push(SalesRecord::new(brand, year, round2(price)));
            }
        }
    }

    Ok(SampleData {
        table: CleanedTable::new([SALES_VOLUME], rows),
        competitors: CleanedTable::from_records(competitors),
        true_elasticity,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sample() {
        let config = SampleConfig::default();
        let a = generate_sample(&config).unwrap();
        let b = generate_sample(&config).unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.competitors, b.competitors);
    }

    #[test]
    fn sample_shape_follows_config() {
        let config = SampleConfig {
            brands: 3,
            years: 4,
            rows_per_year: 5,
            ..Default::default()
        };
        let sample = generate_sample(&config).unwrap();

        // Two full brands plus one sparse brand with two rows.
        assert_eq!(sample.table.len(), 2 * 4 * 5 + 2);
        assert_eq!(sample.true_elasticity.len(), 3);
        assert!(sample.table.has_column(SALES_VOLUME));
        assert!(
            sample
                .table
                .records()
                .iter()
                .all(|r| r.price > 0.0 && r.sales_volume.is_some_and(|v| v >= 0.0))
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SampleConfig {
            brands: 0,
            ..Default::default()
        };
        assert_eq!(generate_sample(&config).unwrap_err().exit_code(), 2);
    }
}
