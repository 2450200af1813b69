//! The mess-cut flow end to end: eligibility gate, skip, owner
//! notification and acknowledgement.

mod common;

use axum::http::StatusCode;
use common::date_in_days;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn eligibility_endpoint_gates_by_date() {
    let app = require_app!();
    let user = app.create_user("cut_gate", "customer").await;

    let resp = app
        .get(
            &format!("/mess-cut/eligibility?date={}&meal_slot=lunch", date_in_days(2)),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["eligible"].as_bool().unwrap());

    let resp = app
        .get(
            &format!("/mess-cut/eligibility?date={}&meal_slot=lunch", date_in_days(-1)),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.json()["eligible"].as_bool().unwrap());
}

#[tokio::test]
async fn skip_marks_the_delivery_and_notifies_the_owner() {
    let app = require_app!();
    let owner = app.create_user("cut_owner", "mess_owner").await;
    let mess_id = app.create_mess(&owner).await;
    let customer = app.create_user("cut_cust", "customer").await;
    let subscription_id = app
        .create_subscription(&customer, mess_id, &["lunch"], &date_in_days(2), &date_in_days(4))
        .await;
    let cut_date = date_in_days(2);

    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": cut_date, "meal_slot": "lunch", "reason": "going home" }),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
    let body = resp.json();
    assert_eq!(body["status"].as_str().unwrap(), "skipped");
    assert_eq!(body["skip_reason"].as_str().unwrap(), "going home");
    let delivery_id = body["id"].as_str().unwrap().to_string();

    // the owner got exactly one mess_cut notification for it
    let resp = app.get("/notifications", Some(&owner.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body["items"].as_array().unwrap();
    let found = items
        .iter()
        .find(|n| n["payload"]["delivery_id"].as_str() == Some(delivery_id.as_str()))
        .expect("owner notification");
    assert_eq!(found["notification_type"].as_str().unwrap(), "mess_cut");
    assert_eq!(found["title"].as_str().unwrap(), "Mess Cut Request");
    assert_eq!(found["payload"]["meal_slot"].as_str().unwrap(), "lunch");
    assert_eq!(found["payload"]["date"].as_str().unwrap(), cut_date);
    assert!(!found["is_read"].as_bool().unwrap());
}

#[tokio::test]
async fn same_day_breakfast_is_inside_the_window() {
    let app = require_app!();
    let owner = app.create_user("cut_late_owner", "mess_owner").await;
    let mess_id = app.create_mess(&owner).await;
    let customer = app.create_user("cut_late", "customer").await;
    // range includes today so the delivery row exists
    let subscription_id = app
        .create_subscription(
            &customer,
            mess_id,
            &["breakfast"],
            &date_in_days(0),
            &date_in_days(2),
        )
        .await;

    // today's breakfast cutoff is long past the 12h notice by now
    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": date_in_days(0), "meal_slot": "breakfast" }),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "mess cut window has closed for this meal");

    // nothing was written
    let resp = app
        .get(
            &format!("/subscriptions/{}/deliveries", subscription_id),
            Some(&customer.access_token),
        )
        .await;
    let body = resp.json();
    let today = date_in_days(0);
    let delivery = body
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["date"].as_str() == Some(today.as_str()))
        .unwrap()
        .clone();
    assert_eq!(delivery["status"].as_str().unwrap(), "scheduled");
    assert!(delivery["skip_requested_at"].is_null());
}

#[tokio::test]
async fn skip_outside_the_plan_is_not_found() {
    let app = require_app!();
    let owner = app.create_user("cut_miss_owner", "mess_owner").await;
    let mess_id = app.create_mess(&owner).await;
    let customer = app.create_user("cut_miss", "customer").await;
    let subscription_id = app
        .create_subscription(&customer, mess_id, &["lunch"], &date_in_days(2), &date_in_days(3))
        .await;

    // eligible date, but no dinner delivery exists on the plan
    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": date_in_days(2), "meal_slot": "dinner" }),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // and outside the date range either
    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": date_in_days(6), "meal_slot": "lunch" }),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_subscriber_may_request_a_cut() {
    let app = require_app!();
    let owner = app.create_user("cut_auth_owner", "mess_owner").await;
    let mess_id = app.create_mess(&owner).await;
    let customer = app.create_user("cut_auth_a", "customer").await;
    let stranger = app.create_user("cut_auth_b", "customer").await;
    let subscription_id = app
        .create_subscription(&customer, mess_id, &["lunch"], &date_in_days(2), &date_in_days(3))
        .await;

    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": date_in_days(2), "meal_slot": "lunch" }),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_acknowledges_a_cut() {
    let app = require_app!();
    let owner = app.create_user("cut_ack_owner", "mess_owner").await;
    let mess_id = app.create_mess(&owner).await;
    let customer = app.create_user("cut_ack", "customer").await;
    let subscription_id = app
        .create_subscription(&customer, mess_id, &["dinner"], &date_in_days(2), &date_in_days(3))
        .await;

    let resp = app
        .post_json(
            &format!("/subscriptions/{}/mess-cut", subscription_id),
            json!({ "date": date_in_days(2), "meal_slot": "dinner" }),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let delivery_id = resp.json()["id"].as_str().unwrap().to_string();

    // a customer cannot acknowledge
    let resp = app
        .post_json(
            &format!("/deliveries/{}/acknowledge", delivery_id),
            json!({}),
            Some(&customer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_json(
            &format!("/deliveries/{}/acknowledge", delivery_id),
            json!({}),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get(
            &format!("/subscriptions/{}/deliveries", subscription_id),
            Some(&customer.access_token),
        )
        .await;
    let body = resp.json();
    let delivery = body
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_str() == Some(delivery_id.as_str()))
        .unwrap()
        .clone();
    assert_eq!(delivery["notes"].as_str().unwrap(), "Acknowledged by mess owner");
}

#[tokio::test]
async fn acknowledging_an_unknown_delivery_is_not_found() {
    let app = require_app!();
    let owner = app.create_user("cut_ack_ghost", "mess_owner").await;
    app.create_mess(&owner).await;

    let resp = app
        .post_json(
            &format!("/deliveries/{}/acknowledge", Uuid::new_v4()),
            json!({}),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
