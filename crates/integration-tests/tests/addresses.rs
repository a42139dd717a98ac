//! Address book: exactly one default per customer.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use solarshop_integration_tests::{base_url, create_address, expect_json, pool, signup_and_login};

async fn addresses(client: &Client) -> Vec<Value> {
    let resp = client
        .get(format!("{}/api/addresses", base_url()))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await.as_array().unwrap().clone()
}

fn default_ids(list: &[Value]) -> Vec<i64> {
    list.iter()
        .filter(|a| a["is_default"] == true)
        .map(|a| a["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_default_address_moves_and_survives_delete() {
    let pool = pool().await;
    let customer = signup_and_login(&pool, "addr").await;

    let first = create_address(&customer.client).await;
    assert_eq!(first["is_default"], true);
    let second = create_address(&customer.client).await;
    assert_eq!(second["is_default"], false);
    let third = create_address(&customer.client).await;
    let first_id = first["id"].as_i64().unwrap();
    let second_id = second["id"].as_i64().unwrap();
    let third_id = third["id"].as_i64().unwrap();
    assert_eq!(default_ids(&addresses(&customer.client).await), vec![first_id]);

    let resp = customer
        .client
        .post(format!("{}/api/addresses/{second_id}/default", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(expect_json(resp, StatusCode::OK).await["is_default"], true);
    let list = addresses(&customer.client).await;
    assert_eq!(default_ids(&list), vec![second_id]);
    assert_eq!(list.first().unwrap()["id"], second_id);

    // Deleting the default hands it to the newest remaining address.
    let resp = customer
        .client
        .delete(format!("{}/api/addresses/{second_id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(default_ids(&addresses(&customer.client).await), vec![third_id]);

    // Removing a non-default address leaves the default alone.
    let resp = customer
        .client
        .delete(format!("{}/api/addresses/{first_id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let list = addresses(&customer.client).await;
    assert_eq!(list.len(), 1);
    assert_eq!(default_ids(&list), vec![third_id]);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_addresses_are_private() {
    let pool = pool().await;
    let owner = signup_and_login(&pool, "addrowner").await;
    let other = signup_and_login(&pool, "addrother").await;
    let address = create_address(&owner.client).await;
    let id = address["id"].as_i64().unwrap();

    let resp = other
        .client
        .post(format!("{}/api/addresses/{id}/default", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = other
        .client
        .delete(format!("{}/api/addresses/{id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(addresses(&owner.client).await.len(), 1);
}
