//! Property-based tests for pricing, parcel sizing and the vendor split.

use proptest::prelude::*;
use rust_decimal::Decimal;
use verdant_api::{
    entities::order::{OrderStatus, PaymentMethod},
    services::{
        orders::{can_transition, included_tax, price_line},
        packaging::{combine, PackageBox, PackageItem},
        wallet::vendor_share,
    },
};

fn dimension() -> impl Strategy<Value = Decimal> {
    (1u32..=120).prop_map(Decimal::from)
}

fn item_strategy() -> impl Strategy<Value = PackageItem> {
    (dimension(), dimension(), dimension(), 0u32..=50_000, 1u32..=6).prop_map(
        |(l, w, h, grams, quantity)| PackageItem {
            dimensions: PackageBox::new(l, w, h),
            weight_kg: Decimal::new(grams as i64, 3),
            quantity,
        },
    )
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Paid),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![Just(PaymentMethod::Cod), Just(PaymentMethod::PayOs)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn parcel_holds_every_unit(items in prop::collection::vec(item_strategy(), 1..5)) {
        let parcel = combine(&items).unwrap();

        let unit_volume: Decimal = items
            .iter()
            .map(|i| i.dimensions.volume() * Decimal::from(i.quantity))
            .sum();
        prop_assert!(parcel.volume() >= unit_volume);

        for item in &items {
            let longest = item.dimensions.length.max(item.dimensions.width).max(item.dimensions.height);
            let parcel_longest = parcel.length.max(parcel.width).max(parcel.height);
            prop_assert!(parcel_longest >= longest);
        }

        let grams: Decimal = items
            .iter()
            .map(|i| i.weight_kg * Decimal::from(i.quantity) * Decimal::ONE_THOUSAND)
            .sum();
        prop_assert_eq!(parcel.weight_grams, grams.ceil());
    }

    #[test]
    fn courier_units_never_round_down(items in prop::collection::vec(item_strategy(), 1..4)) {
        let parcel = combine(&items).unwrap();
        let units = parcel.to_courier_units();
        prop_assert!(Decimal::from(units.length_cm) >= parcel.length);
        prop_assert!(Decimal::from(units.width_cm) >= parcel.width);
        prop_assert!(Decimal::from(units.height_cm) >= parcel.height);
        prop_assert!(units.weight_grams >= 1);
    }

    #[test]
    fn line_discount_stays_within_subtotal(
        price in 0i64..50_000_000,
        quantity in 1i32..1_000,
        pct in 0i64..=100,
    ) {
        let line = price_line(Decimal::from(price), quantity, Decimal::from(pct));
        prop_assert_eq!(line.subtotal, Decimal::from(price) * Decimal::from(quantity));
        prop_assert!(line.discount >= Decimal::ZERO);
        prop_assert!(line.discount <= line.subtotal);
        prop_assert_eq!(line.discount.fract(), Decimal::ZERO);
    }

    #[test]
    fn included_tax_is_a_whole_share_of_the_gross(net in 0i64..1_000_000_000) {
        let gross = Decimal::from(net);
        let tax = included_tax(gross, Decimal::new(1, 1));
        prop_assert_eq!(tax.fract(), Decimal::ZERO);
        prop_assert!(tax <= gross);
    }

    #[test]
    fn vendor_share_never_exceeds_gross(gross in 0i64..1_000_000_000, rate_pct in 0i64..=100) {
        let gross = Decimal::from(gross);
        let share = vendor_share(gross, Decimal::new(rate_pct, 2));
        prop_assert!(share >= Decimal::ZERO);
        prop_assert!(share <= gross);
        prop_assert_eq!(share.fract(), Decimal::ZERO);
    }

    #[test]
    fn terminal_states_stay_terminal(to in status_strategy(), method in method_strategy()) {
        prop_assert!(!can_transition(OrderStatus::Delivered, to, method));
        prop_assert!(!can_transition(OrderStatus::Cancelled, to, method));
    }

    #[test]
    fn only_pending_orders_cancel(from in status_strategy(), method in method_strategy()) {
        let allowed = can_transition(from, OrderStatus::Cancelled, method);
        prop_assert_eq!(allowed, from == OrderStatus::Pending);
    }
}
