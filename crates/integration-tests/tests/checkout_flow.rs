//! Cart to order, end to end over the core rules.

use oncemore_core::order::{remaining_stock, stock_adjustments};
use oncemore_core::{
    Cart, CartItem, CheckoutSummary, CouponError, CouponState, Email, NewOrder, OrderError,
    OrderStatus, PaymentMethod, Price, ProductId, ShippingAddress, StatusPolicy, UserId,
};

fn item(id: i32, rupees: i64, quantity: u32) -> CartItem {
    CartItem {
        product_id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Price::from_rupees(rupees),
        image: format!("https://cdn.example.com/{id}.jpg"),
        quantity,
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".to_owned(),
        mobile_number: "9876543210".to_owned(),
        street: "12 MG Road".to_owned(),
        landmark: Some("Near the park".to_owned()),
        city: "Pune".to_owned(),
        state: "Maharashtra".to_owned(),
        zip: "411001".to_owned(),
        country: "India".to_owned(),
    }
}

fn buyer() -> (UserId, Email) {
    (UserId::new(1), Email::parse("asha@example.in").expect("valid email"))
}

#[test]
fn test_cart_totals_track_every_mutation() {
    let mut cart = Cart::new();
    cart.add(item(1, 300, 1)).expect("add");
    cart.add(item(2, 150, 2)).expect("add");
    cart.add(item(1, 300, 2)).expect("add again");
    assert_eq!(cart.quantity_of(ProductId::new(1)), 3);

    cart.update_quantity(ProductId::new(2), -4).expect("clamp");
    assert!(cart.items().iter().all(|line| line.quantity > 0));
    assert_eq!(cart.items().len(), 1);

    cart.add(item(3, 99, 1)).expect("add");
    cart.remove(ProductId::new(1));

    let expected: u64 = cart.items().iter().map(|l| u64::from(l.quantity)).sum();
    assert_eq!(cart.total_items(), expected);
    assert_eq!(cart.total_price(), Price::from_rupees(99));
}

#[test]
fn test_coupon_applies_once() {
    let cart = Cart::from_items([item(1, 400, 1)]);
    let mut coupon = CouponState::default();

    coupon.apply(" 1ncemore ").expect("first apply");
    assert_eq!(coupon.apply("1NCEMORE"), Err(CouponError::AlreadyApplied));

    let summary = CheckoutSummary::compute(&cart, &coupon);
    assert_eq!(summary.coupon_discount, Price::from_rupees(20));
    assert_eq!(summary.final_total, Price::from_rupees(380));
}

#[test]
fn test_discount_never_goes_negative() {
    let cart = Cart::from_items([item(1, 15, 1)]);
    let summary = CheckoutSummary::quote(&cart, Some("1NCEMORE")).expect("quote");
    assert_eq!(summary.final_total, Price::ZERO);
    assert_eq!(summary.total_amount, Price::from_rupees(60));
}

#[test]
fn test_shipping_threshold_is_exclusive() {
    let at_threshold = Cart::from_items([item(1, 500, 1)]);
    let summary = CheckoutSummary::quote(&at_threshold, None).expect("quote");
    assert_eq!(summary.shipping_cost, Price::from_rupees(60));
    assert_eq!(summary.total_amount, Price::from_rupees(560));

    let above = Cart::from_items([CartItem {
        price: Price::from_paise(50_001),
        ..item(1, 0, 1)
    }]);
    let summary = CheckoutSummary::quote(&above, None).expect("quote");
    assert_eq!(summary.shipping_cost, Price::ZERO);
    assert_eq!(summary.total_amount, Price::from_paise(50_001));
}

#[test]
fn test_order_snapshot_and_stock_lines() {
    let (user_id, email) = buyer();
    let cart = Cart::from_items([item(7, 250, 1), item(8, 120, 3)]);

    let order = NewOrder::from_cart(
        user_id,
        email,
        &cart,
        Some("1NCEMORE"),
        address(),
        PaymentMethod::Cod,
        None,
    )
    .expect("valid order");

    assert_eq!(order.items.len(), 2);
    assert_eq!(order.summary.total_price, Price::from_rupees(610));
    assert_eq!(order.summary.final_total, Price::from_rupees(590));
    assert_eq!(order.summary.shipping_cost, Price::ZERO);

    let adjustments = order.stock_adjustments();
    let quantities: Vec<u32> = adjustments.iter().map(|a| a.quantity).collect();
    assert_eq!(quantities, vec![1, 3]);
}

#[test]
fn test_lines_decrement_stock_independently() {
    let (user_id, email) = buyer();
    // Two separate lines for one product, as a replayed client cart might send
    let order = NewOrder::from_cart(
        user_id,
        email,
        &Cart::from_items([item(5, 100, 1)]),
        None,
        address(),
        PaymentMethod::Whatsapp,
        None,
    )
    .expect("valid order");
    let mut items = order.items;
    items.push(oncemore_core::OrderItem {
        quantity: 3,
        ..items[0].clone()
    });

    let adjustments = stock_adjustments(&items);
    assert_eq!(adjustments.len(), 2);
    assert_ne!(adjustments[0].line, adjustments[1].line);

    let stock = 10;
    assert_eq!(remaining_stock(stock, adjustments[0].quantity), 9);
    assert_eq!(remaining_stock(stock, adjustments[1].quantity), 7);
    assert_eq!(remaining_stock(2, 5), 0);
}

#[test]
fn test_order_rejects_bad_input() {
    let (user_id, email) = buyer();
    let cart = Cart::from_items([item(1, 100, 1)]);

    let empty = NewOrder::from_cart(
        user_id,
        email.clone(),
        &Cart::new(),
        None,
        address(),
        PaymentMethod::Cod,
        None,
    );
    assert_eq!(empty, Err(OrderError::EmptyCart));

    let bad_zip = NewOrder::from_cart(
        user_id,
        email.clone(),
        &cart,
        None,
        ShippingAddress {
            zip: "4110".to_owned(),
            ..address()
        },
        PaymentMethod::Cod,
        None,
    );
    assert!(matches!(bad_zip, Err(OrderError::Address(_))));

    let upi = NewOrder::from_cart(
        user_id,
        email,
        &cart,
        None,
        address(),
        PaymentMethod::Upi,
        Some("   ".to_owned()),
    );
    assert_eq!(upi, Err(OrderError::MissingUpiId));
}

#[test]
fn test_status_policy() {
    assert_eq!(OrderStatus::default(), OrderStatus::Pending);

    for from in OrderStatus::ALL {
        assert!(StatusPolicy::Permissive.check(from, OrderStatus::Cancelled).is_ok());
    }

    assert!(StatusPolicy::Strict
        .check(OrderStatus::Delivered, OrderStatus::Pending)
        .is_err());
    assert!(StatusPolicy::Strict
        .check(OrderStatus::Pending, OrderStatus::Processing)
        .is_ok());
    assert_eq!("Shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
}
