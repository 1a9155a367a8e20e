//! Greedy parcel sizing for multi-item orders.
//!
//! Items are stacked one unit at a time. Each unit is placed against the
//! current box along whichever axis yields the smallest resulting volume.
//! The result is a heuristic upper bound, not an optimal packing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageBox {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

impl PackageBox {
    pub fn new(length: Decimal, width: Decimal, height: Decimal) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn volume(&self) -> Decimal {
        self.length * self.width * self.height
    }
}

/// One order line as seen by the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageItem {
    pub dimensions: PackageBox,
    pub weight_kg: Decimal,
    pub quantity: u32,
}

/// Parcel size in centimetres and weight in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight_grams: Decimal,
}

/// Whole-number parcel figures as courier APIs expect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierUnits {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
    pub weight_grams: u32,
}

impl PackageDimensions {
    pub fn to_courier_units(&self) -> CourierUnits {
        CourierUnits {
            length_cm: ceil_at_least_one(self.length),
            width_cm: ceil_at_least_one(self.width),
            height_cm: ceil_at_least_one(self.height),
            weight_grams: ceil_at_least_one(self.weight_grams),
        }
    }

    pub fn volume(&self) -> Decimal {
        self.length * self.width * self.height
    }
}

fn ceil_at_least_one(value: Decimal) -> u32 {
    value.ceil().to_u32().unwrap_or(u32::MAX).max(1)
}

/// Places `item` against `current`, choosing the stacking axis with the
/// smallest resulting volume. Ties go to length, then width, then height.
pub fn extend(current: &PackageBox, item: &PackageBox) -> PackageBox {
    let along_length = PackageBox::new(
        current.length + item.length,
        current.width.max(item.width),
        current.height.max(item.height),
    );
    let along_width = PackageBox::new(
        current.length.max(item.length),
        current.width + item.width,
        current.height.max(item.height),
    );
    let along_height = PackageBox::new(
        current.length.max(item.length),
        current.width.max(item.width),
        current.height + item.height,
    );

    let mut best = along_length;
    for candidate in [along_width, along_height] {
        if candidate.volume() < best.volume() {
            best = candidate;
        }
    }
    best
}

/// Folds every unit of every item into one parcel.
pub fn combine(items: &[PackageItem]) -> Result<PackageDimensions, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "cannot package an empty item list".to_string(),
        ));
    }

    let mut parcel = PackageBox::default();
    let mut weight_kg = Decimal::ZERO;

    for item in items {
        if item.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "item quantity must be at least 1".to_string(),
            ));
        }
        let dims = &item.dimensions;
        if dims.length.is_sign_negative()
            || dims.width.is_sign_negative()
            || dims.height.is_sign_negative()
            || item.weight_kg.is_sign_negative()
        {
            return Err(ServiceError::ValidationError(
                "item dimensions and weight must not be negative".to_string(),
            ));
        }

        for _ in 0..item.quantity {
            parcel = extend(&parcel, dims);
        }
        weight_kg += item.weight_kg * Decimal::from(item.quantity);
    }

    Ok(PackageDimensions {
        length: parcel.length,
        width: parcel.width,
        height: parcel.height,
        weight_grams: (weight_kg * Decimal::ONE_THOUSAND).ceil(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(l: Decimal, w: Decimal, h: Decimal, kg: Decimal, qty: u32) -> PackageItem {
        PackageItem {
            dimensions: PackageBox::new(l, w, h),
            weight_kg: kg,
            quantity: qty,
        }
    }

    #[test]
    fn single_item_keeps_its_own_size() {
        let dims = combine(&[item(dec!(30), dec!(20), dec!(10), dec!(1.25), 1)]).unwrap();
        assert_eq!(dims.length, dec!(30));
        assert_eq!(dims.width, dec!(20));
        assert_eq!(dims.height, dec!(10));
        assert_eq!(dims.weight_grams, dec!(1250));
    }

    #[test]
    fn thin_item_goes_on_top() {
        let dims = combine(&[
            item(dec!(30), dec!(20), dec!(2), dec!(0.1), 1),
            item(dec!(30), dec!(20), dec!(1), dec!(0.1), 1),
        ])
        .unwrap();
        assert_eq!((dims.length, dims.width, dims.height), (dec!(30), dec!(20), dec!(3)));
    }

    #[test]
    fn identical_units_line_up_along_length() {
        let dims = combine(&[item(dec!(30), dec!(20), dec!(2), dec!(0.1), 3)]).unwrap();
        assert_eq!((dims.length, dims.width, dims.height), (dec!(90), dec!(20), dec!(2)));
    }

    #[test]
    fn equal_volumes_prefer_length() {
        let cube = PackageBox::new(dec!(10), dec!(10), dec!(10));
        let out = extend(&cube, &cube);
        assert_eq!(out, PackageBox::new(dec!(20), dec!(10), dec!(10)));
    }

    #[test]
    fn weight_rounds_up_to_whole_grams() {
        let dims = combine(&[item(dec!(1), dec!(1), dec!(1), dec!(0.0004), 3)]).unwrap();
        assert_eq!(dims.weight_grams, dec!(2));
    }

    #[test]
    fn courier_units_are_ceiled_and_at_least_one() {
        let dims = PackageDimensions {
            length: dec!(10.2),
            width: dec!(0),
            height: dec!(3),
            weight_grams: dec!(0),
        };
        let units = dims.to_courier_units();
        assert_eq!(units.length_cm, 11);
        assert_eq!(units.width_cm, 1);
        assert_eq!(units.height_cm, 3);
        assert_eq!(units.weight_grams, 1);
    }

    #[test]
    fn rejects_empty_and_zero_quantity() {
        assert_matches!(combine(&[]), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            combine(&[item(dec!(1), dec!(1), dec!(1), dec!(1), 0)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    fn dim() -> impl Strategy<Value = Decimal> {
        (0u32..=200).prop_map(Decimal::from)
    }

    proptest! {
        #[test]
        fn extend_picks_minimum_candidate_volume(
            l in dim(), w in dim(), h in dim(),
            il in dim(), iw in dim(), ih in dim(),
        ) {
            let current = PackageBox::new(l, w, h);
            let it = PackageBox::new(il, iw, ih);
            let out = extend(&current, &it);

            let v1 = (l + il) * w.max(iw) * h.max(ih);
            let v2 = l.max(il) * (w + iw) * h.max(ih);
            let v3 = l.max(il) * w.max(iw) * (h + ih);
            prop_assert_eq!(out.volume(), v1.min(v2).min(v3));
        }

        #[test]
        fn parcel_contains_every_item(
            sizes in prop::collection::vec((1u32..=50, 1u32..=50, 1u32..=50, 1u32..=3), 1..6)
        ) {
            let items: Vec<PackageItem> = sizes
                .iter()
                .map(|&(l, w, h, q)| item(l.into(), w.into(), h.into(), dec!(0.5), q))
                .collect();
            let dims = combine(&items).unwrap();
            let parcel_volume = dims.volume();
            let item_volume: Decimal = items
                .iter()
                .map(|i| i.dimensions.volume() * Decimal::from(i.quantity))
                .sum();
            prop_assert!(parcel_volume >= item_volume);
        }
    }
}
