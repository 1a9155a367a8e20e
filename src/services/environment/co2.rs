use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::ServiceError;

/// kg CO2e per unit of each input.
pub const GRID_ELECTRICITY_PER_KWH: f64 = 0.6592;
pub const DIESEL_PER_LITER: f64 = 2.68;
pub const GASOLINE_PER_LITER: f64 = 2.31;
pub const NITROGEN_FERTILIZER_PER_KG: f64 = 5.88;
pub const PHOSPHATE_FERTILIZER_PER_KG: f64 = 1.2;
pub const POTASSIUM_FERTILIZER_PER_KG: f64 = 0.65;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Co2Input {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub electricity_kwh: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub diesel_liters: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub gasoline_liters: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub nitrogen_fertilizer_kg: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub phosphate_fertilizer_kg: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub potassium_fertilizer_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Source {
    pub source: String,
    pub quantity: f64,
    pub unit: String,
    pub factor: f64,
    pub kg_co2e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Estimate {
    pub breakdown: Vec<Co2Source>,
    pub total_kg_co2e: f64,
    pub total_tonnes_co2e: f64,
}

pub fn estimate(input: &Co2Input) -> Result<Co2Estimate, ServiceError> {
    input.validate()?;

    let sources = [
        ("electricity", input.electricity_kwh, "kWh", GRID_ELECTRICITY_PER_KWH),
        ("diesel", input.diesel_liters, "L", DIESEL_PER_LITER),
        ("gasoline", input.gasoline_liters, "L", GASOLINE_PER_LITER),
        ("nitrogen_fertilizer", input.nitrogen_fertilizer_kg, "kg", NITROGEN_FERTILIZER_PER_KG),
        ("phosphate_fertilizer", input.phosphate_fertilizer_kg, "kg", PHOSPHATE_FERTILIZER_PER_KG),
        ("potassium_fertilizer", input.potassium_fertilizer_kg, "kg", POTASSIUM_FERTILIZER_PER_KG),
    ];

    let breakdown: Vec<Co2Source> = sources
        .into_iter()
        .filter(|(_, quantity, _, _)| *quantity > 0.0)
        .map(|(source, quantity, unit, factor)| Co2Source {
            source: source.to_string(),
            quantity,
            unit: unit.to_string(),
            factor,
            kg_co2e: round2(quantity * factor),
        })
        .collect();

    let total = round2(breakdown.iter().map(|s| s.kg_co2e).sum());
    Ok(Co2Estimate {
        breakdown,
        total_kg_co2e: total,
        total_tonnes_co2e: total.round() / 1000.0,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn sums_each_source() {
        let estimate = estimate(&Co2Input {
            electricity_kwh: 100.0,
            diesel_liters: 10.0,
            nitrogen_fertilizer_kg: 2.0,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(estimate.breakdown.len(), 3);
        assert_eq!(estimate.breakdown[0].kg_co2e, 65.92);
        assert_eq!(estimate.breakdown[1].kg_co2e, 26.8);
        assert_eq!(estimate.total_kg_co2e, 104.48);
        assert_eq!(estimate.total_tonnes_co2e, 0.104);
    }

    #[test]
    fn empty_input_is_zero() {
        let estimate = estimate(&Co2Input::default()).unwrap();
        assert!(estimate.breakdown.is_empty());
        assert_eq!(estimate.total_kg_co2e, 0.0);
    }

    #[test]
    fn negative_usage_is_rejected() {
        let input = Co2Input {
            diesel_liters: -1.0,
            ..Default::default()
        };
        assert_matches!(estimate(&input), Err(ServiceError::ValidationError(_)));
    }
}
