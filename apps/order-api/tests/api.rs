//! End-to-end tests driving the router in-process.
//!
//! The store clock is frozen at Friday 2024-03-15 12:00 (UTC offset 0)
//! unless a test picks another instant.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bistro_api::clock::FixedClock;
use bistro_api::config::ApiConfig;
use bistro_api::{build_router, ApiError, AppState};
use bistro_core::{CustomerDetails, Dish, OrderStatus, PlacedOrder, PromotionPayload};
use bistro_db::{Database, DbConfig};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Harness
// =============================================================================

struct TestApp {
    router: Router,
    db: Database,
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

impl TestApp {
    async fn new() -> Self {
        Self::build(DbConfig::in_memory(), noon()).await
    }

    async fn at(now: DateTime<Utc>) -> Self {
        Self::build(DbConfig::in_memory(), now).await
    }

    async fn build(db_config: DbConfig, now: DateTime<Utc>) -> Self {
        let db = Database::new(db_config).await.unwrap();

        for (id, category, price) in [
            ("pho", "c-noodle", 38_000),
            ("bun-cha", "c-noodle", 43_000),
            ("tra-da", "c-drink", 5_000),
            ("com-tam", "c-rice", 50_000),
        ] {
            db.dishes()
                .insert(&Dish {
                    id: id.to_string(),
                    name: id.to_string(),
                    category: category.to_string(),
                    price,
                    is_active: true,
                })
                .await
                .unwrap();
        }
        db.dishes()
            .insert(&Dish {
                id: "off-menu".to_string(),
                name: "Seasonal".to_string(),
                category: "c-noodle".to_string(),
                price: 60_000,
                is_active: false,
            })
            .await
            .unwrap();

        let config = ApiConfig {
            utc_offset_minutes: Some(0),
            ..ApiConfig::default()
        };
        let clock = FixedClock(now);
        let state = AppState::with_clock(db.clone(), config, Arc::new(clock));

        TestApp {
            router: build_router(state),
            db,
        }
    }

    /// Inserts a promotion straight into the catalog under a fixed id.
    async fn promotion(&self, id: &str, payload: Value) {
        let mut payload = payload;
        let object = payload.as_object_mut().unwrap();
        object.entry("name").or_insert(json!(id));
        object.entry("startDate").or_insert(json!("2024-01-01"));
        object.entry("endDate").or_insert(json!("2024-12-31"));

        let payload: PromotionPayload = serde_json::from_value(payload).unwrap();
        let promotion = payload.into_promotion(id).unwrap();
        self.db.promotions().create(&promotion).await.unwrap();
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn usage_count(&self, id: &str) -> u32 {
        self.db.ledger().usage_count(id).await.unwrap()
    }
}

fn line(dish: &str, quantity: i64, price: i64) -> Value {
    json!({
        "dishId": dish,
        "name": dish,
        "quantity": quantity,
        "pricePerQuantity": price,
        "toppings": []
    })
}

fn bills(subtotal: i64, discount: i64, total: i64) -> Value {
    json!({
        "subtotal": subtotal,
        "promotionDiscount": discount,
        "total": total,
        "tax": 0,
        "totalWithTax": total
    })
}

fn claim(id: &str, kind: &str, amount: i64) -> Value {
    json!({
        "promotionId": id,
        "name": id,
        "type": kind,
        "discountAmount": amount
    })
}

fn order(items: Vec<Value>, bills: Value, applied: Vec<Value>) -> Value {
    json!({
        "customerDetails": { "name": "Lan", "phone": "0901234567", "guests": 2 },
        "orderStatus": "In Progress",
        "bills": bills,
        "appliedPromotions": applied,
        "items": items,
        "thirdPartyVendor": null
    })
}

// =============================================================================
// Order submission
// =============================================================================

#[tokio::test]
async fn test_order_without_promotion() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/order",
            order(vec![line("pho", 1, 38_000)], bills(38_000, 0, 38_000), vec![]),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["bills"]["total"], 38_000);
    assert_eq!(body["data"]["bills"]["promotionDiscount"], 0);
    assert!(body["data"]["_id"].is_string());
    assert_eq!(body["data"]["items"][0]["category"], "c-noodle");
}

#[tokio::test]
async fn test_order_percentage_discount() {
    let app = TestApp::new().await;
    app.promotion(
        "pct10",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 3_800, 34_200),
                vec![claim("pct10", "order_percentage", 3_800)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["total"], 34_200);
    assert_eq!(body["data"]["appliedPromotions"][0]["discountAmount"], 3_800);
    assert_eq!(app.usage_count("pct10").await, 1);
}

#[tokio::test]
async fn test_order_fixed_discount() {
    let app = TestApp::new().await;
    app.promotion(
        "fixed5k",
        json!({ "type": "order_fixed", "discount": { "fixedAmount": 5000 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("bun-cha", 1, 43_000)],
                bills(43_000, 5_000, 38_000),
                vec![claim("fixed5k", "order_fixed", 5_000)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["total"], 38_000);
}

#[tokio::test]
async fn test_multi_item_order() {
    let app = TestApp::new().await;
    app.promotion(
        "pct10",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("bun-cha", 1, 43_000), line("pho", 2, 38_000)],
                bills(119_000, 11_900, 107_100),
                vec![claim("pct10", "order_percentage", 11_900)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["subtotal"], 119_000);
    assert_eq!(body["data"]["bills"]["total"], 107_100);
}

#[tokio::test]
async fn test_invalid_promotion_math_is_rejected() {
    let app = TestApp::new().await;
    app.promotion(
        "pct10",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 3_800, 30_000),
                vec![claim("pct10", "order_percentage", 3_800)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BILL_MISMATCH");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("total"));
    assert!(message.contains("34200"));
    assert!(message.contains("30000"));

    // nothing reserved
    assert_eq!(app.usage_count("pct10").await, 0);
}

#[tokio::test]
async fn test_claimed_discount_amount_must_match() {
    let app = TestApp::new().await;
    app.promotion(
        "pct10",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 3_800, 34_200),
                vec![claim("pct10", "order_percentage", 9_999)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BILL_MISMATCH");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("appliedPromotions[0].discountAmount"));
}

#[tokio::test]
async fn test_item_scope_leaves_other_lines_alone() {
    let app = TestApp::new().await;
    app.promotion(
        "drinks50",
        json!({
            "type": "item_percentage",
            "discount": { "percentage": 50 },
            "applicableItems": "categories",
            "categories": ["c-drink"]
        }),
    )
    .await;

    // only the drink line is halved
    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000), line("tra-da", 1, 5_000)],
                bills(43_000, 2_500, 40_500),
                vec![claim("drinks50", "item_percentage", 2_500)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    // claiming half the whole order is a mismatch
    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000), line("tra-da", 1, 5_000)],
                bills(43_000, 21_500, 21_500),
                vec![claim("drinks50", "item_percentage", 21_500)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BILL_MISMATCH");
}

#[tokio::test]
async fn test_category_comes_from_menu_not_client() {
    let app = TestApp::new().await;
    app.promotion(
        "drinks50",
        json!({
            "type": "item_percentage",
            "discount": { "percentage": 50 },
            "applicableItems": "categories",
            "categories": ["c-drink"]
        }),
    )
    .await;

    let mut pho = line("pho", 1, 38_000);
    pho["category"] = json!("c-drink");

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![pho],
                bills(38_000, 19_000, 19_000),
                vec![claim("drinks50", "item_percentage", 19_000)],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");
}

#[tokio::test]
async fn test_time_and_date_windows() {
    let app = TestApp::new().await;
    app.promotion(
        "afternoon",
        json!({
            "type": "happy_hour",
            "discountType": "percentage",
            "discount": { "percentage": 20 },
            "conditions": { "timeSlots": [{ "start": "14:00", "end": "17:00" }] }
        }),
    )
    .await;
    app.promotion(
        "last-year",
        json!({
            "type": "order_percentage",
            "discount": { "percentage": 20 },
            "startDate": "2023-01-01",
            "endDate": "2023-12-31"
        }),
    )
    .await;

    for (id, kind) in [("afternoon", "happy_hour"), ("last-year", "order_percentage")] {
        let (status, body) = app
            .post(
                "/api/order",
                order(
                    vec![line("pho", 1, 38_000)],
                    bills(38_000, 7_600, 30_400),
                    vec![claim(id, kind, 7_600)],
                ),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", id);
        assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");
    }

    // preview never picks them either
    let (status, body) = app
        .post("/api/order/price", json!({ "items": [line("pho", 1, 38_000)] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bills"]["promotionDiscount"], 0);
}

#[tokio::test]
async fn test_happy_hour_uniform_price_inside_slot() {
    let app = TestApp::new().await;
    app.promotion(
        "noodle-hour",
        json!({
            "type": "happy_hour",
            "discountType": "uniform_price",
            "discount": { "uniformPrice": 25000 },
            "applicableItems": "categories",
            "categories": ["c-noodle"],
            "conditions": { "timeSlots": [{ "start": "11:00", "end": "14:00" }] }
        }),
    )
    .await;

    let items = vec![
        line("pho", 2, 38_000),
        line("bun-cha", 1, 43_000),
        line("tra-da", 1, 5_000),
    ];

    // (38,000 - 25,000) x 2 + (43,000 - 25,000); the drink keeps its price
    let (status, priced) = app
        .post("/api/order/price", json!({ "items": items.clone() }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(priced["data"]["bills"]["promotionDiscount"], 44_000);
    assert_eq!(priced["data"]["lines"][2]["discount"], 0);

    let (status, body) = app
        .post(
            "/api/order",
            order(
                items,
                bills(124_000, 44_000, 80_000),
                vec![claim("noodle-hour", "happy_hour", 44_000)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["total"], 80_000);
    assert_eq!(body["data"]["appliedPromotions"][0]["type"], "happy_hour");
    assert_eq!(app.usage_count("noodle-hour").await, 1);
}

#[tokio::test]
async fn test_happy_hour_percentage_on_specific_dishes() {
    let app = TestApp::new().await;
    app.promotion(
        "tea-time",
        json!({
            "type": "happy_hour",
            "discountType": "percentage",
            "discount": { "percentage": 20 },
            "applicableItems": "specific_dishes",
            "specificDishes": ["tra-da"],
            "conditions": { "timeSlots": [{ "start": "11:30", "end": "13:00" }] }
        }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000), line("tra-da", 2, 5_000)],
                bills(48_000, 2_000, 46_000),
                vec![claim("tea-time", "happy_hour", 2_000)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["promotionDiscount"], 2_000);
}

#[tokio::test]
async fn test_happy_hour_follows_store_clock() {
    let evening = json!({
        "type": "happy_hour",
        "discountType": "percentage",
        "discount": { "percentage": 10 },
        "conditions": { "timeSlots": [{ "start": "18:00", "end": "21:00" }] }
    });
    let submission = order(
        vec![line("pho", 1, 38_000)],
        bills(38_000, 3_800, 34_200),
        vec![claim("evening", "happy_hour", 3_800)],
    );

    let lunch = TestApp::new().await;
    lunch.promotion("evening", evening.clone()).await;
    let (status, body) = lunch.post("/api/order", submission.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");
    assert!(body["message"].as_str().unwrap().contains("time slots"));

    let dinner = TestApp::at(Utc.with_ymd_and_hms(2024, 3, 15, 19, 30, 0).unwrap()).await;
    dinner.promotion("evening", evening).await;
    let (status, body) = dinner.post("/api/order", submission).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bills"]["total"], 34_200);
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 2, 1 << 62)],
                bills(0, 0, 0),
                vec![],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("items[0].pricePerQuantity"));

    let mut extreme = bills(38_000, 0, 38_000);
    extreme["tax"] = json!(i64::MIN);
    let (status, body) = app
        .post(
            "/api/order",
            order(vec![line("pho", 1, 38_000)], extreme, vec![]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BILL_MISMATCH");
    assert!(body["message"].as_str().unwrap().contains("tax"));
}

#[tokio::test]
async fn test_line_price_must_match_menu() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/order",
            order(vec![line("pho", 1, 1)], bills(1, 0, 1), vec![]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("38000"));

    let (status, _) = app
        .post("/api/order/price", json!({ "items": [line("pho", 1, 1)] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_usage_limit_exhaustion() {
    let app = TestApp::new().await;
    app.promotion(
        "once",
        json!({
            "type": "order_fixed",
            "discount": { "fixedAmount": 5000 },
            "conditions": { "usageLimit": 1 }
        }),
    )
    .await;

    let submit = || {
        app.post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 5_000, 33_000),
                vec![claim("once", "order_fixed", 5_000)],
            ),
        )
    };

    let (status, _) = submit().await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.usage_count("once").await, 1);

    let (status, body) = submit().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");
    assert!(body["message"].as_str().unwrap().contains("usage limit"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_race_for_last_use() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("bistro.db")).max_connections(8);
    let app = Arc::new(TestApp::build(config, noon()).await);
    app.promotion(
        "once",
        json!({
            "type": "order_fixed",
            "discount": { "fixedAmount": 5000 },
            "conditions": { "usageLimit": 1 }
        }),
    )
    .await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                app.post(
                    "/api/order",
                    order(
                        vec![line("pho", 1, 38_000)],
                        bills(38_000, 5_000, 33_000),
                        vec![claim("once", "order_fixed", 5_000)],
                    ),
                )
                .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        match status {
            StatusCode::CREATED => created += 1,
            // lost at commit: the ledger refused the last use
            StatusCode::CONFLICT => assert_eq!(body["code"], "PROMOTION_UNAVAILABLE"),
            // lost before commit: matching already saw the counter at its limit
            StatusCode::BAD_REQUEST => assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE"),
            other => panic!("unexpected status {other}: {body}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(app.usage_count("once").await, 1);
    app.db.close().await;
}

#[tokio::test]
async fn test_commit_after_last_use_taken_is_409() {
    let app = TestApp::new().await;
    app.promotion(
        "once",
        json!({
            "type": "order_fixed",
            "discount": { "fixedAmount": 5000 },
            "conditions": { "usageLimit": 1 }
        }),
    )
    .await;

    // priced while a use was still free
    let (status, priced) = app
        .post("/api/order/price", json!({ "items": [line("pho", 1, 38_000)] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(priced["data"]["appliedPromotions"][0]["promotionId"], "once");

    // another terminal takes it before this one commits
    app.db.ledger().reserve("once", None).await.unwrap();

    let placed = PlacedOrder {
        id: "late-order".to_string(),
        customer_details: CustomerDetails::default(),
        order_status: OrderStatus::InProgress,
        bills: serde_json::from_value(priced["data"]["bills"].clone()).unwrap(),
        applied_promotions: serde_json::from_value(priced["data"]["appliedPromotions"].clone())
            .unwrap(),
        items: vec![serde_json::from_value(line("pho", 1, 38_000)).unwrap()],
        third_party_vendor: None,
        created_at: noon(),
        cancelled_at: None,
    };
    let err = app
        .db
        .orders()
        .commit(&placed, None, noon().date_naive())
        .await
        .unwrap_err();

    let api_err = ApiError::from(err);
    assert_eq!(api_err.code.status(), StatusCode::CONFLICT);
    assert_eq!(
        serde_json::to_value(api_err.code).unwrap(),
        json!("PROMOTION_UNAVAILABLE")
    );
    assert_eq!(app.usage_count("once").await, 1);
    assert_eq!(app.get("/api/order/late-order").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_one_promotion_per_order() {
    let app = TestApp::new().await;
    app.promotion(
        "a",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 } }),
    )
    .await;
    app.promotion(
        "b",
        json!({ "type": "order_fixed", "discount": { "fixedAmount": 1000 } }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 4_800, 33_200),
                vec![
                    claim("a", "order_percentage", 3_800),
                    claim("b", "order_fixed", 1_000),
                ],
            ),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bad_order_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/order",
            order(vec![line("nope", 1, 1_000)], bills(1_000, 0, 1_000), vec![]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("nope"));

    let (status, _) = app
        .post(
            "/api/order",
            order(vec![line("off-menu", 1, 60_000)], bills(60_000, 0, 60_000), vec![]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/order",
            order(vec![line("pho", 0, 38_000)], bills(0, 0, 0), vec![]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.post("/api/order", json!({ "items": "oops" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 0, 38_000),
                vec![claim("ghost", "order_fixed", 0)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// =============================================================================
// Coupons
// =============================================================================

#[tokio::test]
async fn test_coupon_flow() {
    let app = TestApp::new().await;
    app.promotion(
        "lunch",
        json!({
            "type": "order_percentage",
            "discount": { "percentage": 10 },
            "code": "LUNCH10"
        }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/promotion/validate-coupon",
            json!({ "code": "  lunch10 ", "order": { "items": [line("pho", 1, 38_000)] } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["promotion"]["_id"], "lunch");
    assert_eq!(body["data"]["preview"]["bills"]["total"], 34_200);

    let (status, body) = app
        .post("/api/promotion/validate-coupon", json!({ "code": "DINNER" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // claiming the coupon promotion without its code fails
    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 3_800, 34_200),
                vec![claim("lunch", "order_percentage", 3_800)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");

    let mut with_code = claim("lunch", "order_percentage", 3_800);
    with_code["code"] = json!("Lunch10");
    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 3_800, 34_200),
                vec![with_code],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    // preview only applies the coupon when it is supplied
    let (_, body) = app
        .post("/api/order/price", json!({ "items": [line("pho", 1, 38_000)] }))
        .await;
    assert_eq!(body["data"]["bills"]["promotionDiscount"], 0);
    let (_, body) = app
        .post(
            "/api/order/price",
            json!({ "items": [line("pho", 1, 38_000)], "couponCode": "lunch10" }),
        )
        .await;
    assert_eq!(body["data"]["bills"]["promotionDiscount"], 3_800);
}

#[tokio::test]
async fn test_coupon_ineligible_for_cart() {
    let app = TestApp::new().await;
    app.promotion(
        "big",
        json!({
            "type": "order_fixed",
            "discount": { "fixedAmount": 20000 },
            "conditions": { "minOrderAmount": 100000 },
            "code": "BIG20"
        }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/promotion/validate-coupon",
            json!({ "code": "BIG20", "order": { "items": [line("pho", 1, 38_000)] } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PROMOTION_NOT_APPLICABLE");
    assert!(body["message"].as_str().unwrap().contains("below the minimum"));

    // without a cart only order-independent conditions are checked
    let (status, _) = app
        .post("/api/promotion/validate-coupon", json!({ "code": "BIG20" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Preview, lookup, cancellation
// =============================================================================

#[tokio::test]
async fn test_preview_picks_highest_priority() {
    let app = TestApp::new().await;
    app.promotion(
        "low",
        json!({ "type": "order_percentage", "discount": { "percentage": 50 }, "priority": 1 }),
    )
    .await;
    app.promotion(
        "high",
        json!({ "type": "order_fixed", "discount": { "fixedAmount": 1000 }, "priority": 9 }),
    )
    .await;

    let request = json!({ "items": [line("pho", 1, 38_000)] });
    let (status, first) = app.post("/api/order/price", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["appliedPromotions"][0]["promotionId"], "high");
    assert_eq!(first["data"]["bills"]["total"], 37_000);

    let (_, second) = app.post("/api/order/price", request).await;
    assert_eq!(first, second);

    // preview never touches the ledger
    assert_eq!(app.usage_count("high").await, 0);
}

#[tokio::test]
async fn test_cancel_releases_usage() {
    let app = TestApp::new().await;
    app.promotion(
        "once",
        json!({
            "type": "order_fixed",
            "discount": { "fixedAmount": 5000 },
            "conditions": { "usageLimit": 1 }
        }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/order",
            order(
                vec![line("pho", 1, 38_000)],
                bills(38_000, 5_000, 33_000),
                vec![claim("once", "order_fixed", 5_000)],
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/order/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bills"]["total"], 33_000);

    let (status, body) = app
        .send("POST", &format!("/api/order/{}/cancel", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderStatus"], "Cancelled");
    assert_eq!(app.usage_count("once").await, 0);

    let (status, body) = app
        .send("POST", &format!("/api/order/{}/cancel", id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(app.usage_count("once").await, 0);

    let (status, _) = app.send("POST", "/api/order/missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/order/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Promotion admin & analytics
// =============================================================================

#[tokio::test]
async fn test_promotion_crud() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Noodle Tuesday",
        "type": "item_fixed",
        "discount": { "fixedAmount": 3000 },
        "applicableItems": "categories",
        "categories": ["c-noodle"],
        "conditions": { "daysOfWeek": ["tuesday"] },
        "startDate": "2024-01-01",
        "endDate": "2024-12-31",
        "code": "NOODLE",
        "usageCount": 99
    });

    let (status, body) = app.post("/api/promotion", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let id = body["data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["usageCount"], 0);

    let (status, body) = app.get("/api/promotion").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let mut edited = payload.clone();
    edited["name"] = json!("Noodle Wednesday");
    edited["conditions"]["daysOfWeek"] = json!(["wednesday"]);
    let (status, body) = app
        .send("PUT", &format!("/api/promotion/{}", id), Some(edited))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "Noodle Wednesday");

    // codes are unique regardless of case
    let mut duplicate = payload.clone();
    duplicate["code"] = json!("noodle");
    let (status, _) = app.post("/api/promotion", duplicate).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut invalid = payload;
    invalid["code"] = json!(null);
    invalid["type"] = json!("item_percentage");
    invalid["discount"] = json!({ "percentage": 150 });
    let (status, body) = app.post("/api/promotion", invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("discount.percentage"));

    let (status, _) = app
        .send("DELETE", &format!("/api/promotion/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/promotion/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_counts_committed_orders() {
    let app = TestApp::new().await;
    app.promotion(
        "pct10",
        json!({ "type": "order_percentage", "discount": { "percentage": 10 }, "conditions": { "usageLimit": 10 } }),
    )
    .await;

    for _ in 0..2 {
        let (status, _) = app
            .post(
                "/api/order",
                order(
                    vec![line("pho", 1, 38_000)],
                    bills(38_000, 3_800, 34_200),
                    vec![claim("pct10", "order_percentage", 3_800)],
                ),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .get("/api/promotion/analytics?startDate=2024-03-15&endDate=2024-03-15")
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let row = &body["data"][0];
    assert_eq!(row["promotionId"], "pct10");
    assert_eq!(row["usageCount"], 2);
    assert_eq!(row["remainingUsage"], 8);
    assert_eq!(row["redemptions"], 2);
    assert_eq!(row["totalDiscount"], 7_600);

    let (_, body) = app
        .get("/api/promotion/analytics?startDate=2024-03-16&endDate=2024-03-31")
        .await;
    assert_eq!(body["data"][0]["redemptions"], 0);

    let (status, _) = app
        .get("/api/promotion/analytics?startDate=2024-03-20&endDate=2024-03-01")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], true);
}
