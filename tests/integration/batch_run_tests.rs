use super::*;
use pricewatch::config::SiteConfig;
use pricewatch::models::Outcome;
use pricewatch::watchlist::load_watchlist;
use pricewatch::{BatchRunner, models::WatchEntry};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, ResponseTemplate};

fn entry(url: String, target: &str) -> WatchEntry {
    WatchEntry::new(url, Decimal::from_str(target).unwrap(), CONTACT).unwrap()
}

#[tokio::test]
async fn test_price_drop_sends_one_message() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page("p1", &product_page("$89.99")).await;
    Mock::given(method("POST"))
        .and(body_string_contains("89.99"))
        .and(body_string_contains("To=%2B64211234567"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})))
        .expect(1)
        .mount(&env.twilio)
        .await;

    let runner = BatchRunner::from_config(&env.config(), false).await?;
    let results = runner.run(&[entry(env.url("p1"), "100.00")]).await;

    assert_eq!(
        results[0].outcome,
        Outcome::Notified {
            price: Decimal::from_str("89.99")?,
            message_id: Some("SM1".to_string()),
        }
    );

    let requests = env.twilio.received_requests().await.unwrap_or_default();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    let sent_url = format!("{}/p1", env.shop.uri());
    assert!(body.contains(&url::form_urlencoded::byte_serialize(sent_url.as_bytes()).collect::<String>()));
    println!("✓ Message names the product and the observed price");

    Ok(())
}

#[tokio::test]
async fn test_timeout_on_every_attempt_sends_nothing() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(2000)))
        .expect(3)
        .mount(&env.shop)
        .await;
    env.accept_messages(0).await;

    let runner = BatchRunner::from_config(&env.config(), false).await?;
    let results = runner.run(&[entry(env.url("slow"), "100.00")]).await;

    match &results[0].outcome {
        Outcome::FetchError { error } => assert!(error.contains("3 attempt")),
        other => panic!("expected fetch error, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_page_without_any_price() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page(
        "p1",
        "<html><body><h1>Widget 3000</h1><p>Back in stock soon. 4.5 stars from 120 reviews.</p></body></html>",
    )
    .await;
    env.accept_messages(0).await;

    let runner = BatchRunner::from_config(&env.config(), false).await?;
    let results = runner.run(&[entry(env.url("p1"), "100.00")]).await;

    assert_eq!(results[0].outcome, Outcome::PriceNotFound);
    assert_eq!(results[0].reading.observed_price, None);

    Ok(())
}

#[tokio::test]
async fn test_provider_rejection_is_recorded() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page("p1", &product_page("$10.00")).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": 20003,
            "message": "Authenticate",
            "status": 401
        })))
        .expect(1)
        .mount(&env.twilio)
        .await;

    let runner = BatchRunner::from_config(&env.config(), false).await?;
    let results = runner.run(&[entry(env.url("p1"), "20")]).await;

    match &results[0].outcome {
        Outcome::NotificationFailed { error, .. } => assert!(error.contains("Authenticate")),
        other => panic!("expected failed notification, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_mixed_watchlist_end_to_end() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page("cheap", &product_page("$1,299.00")).await;
    env.serve_page("pricey", &product_page("$2,499.00")).await;
    env.serve_page("blank", "<html><body>Sold out</body></html>").await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&env.shop)
        .await;
    env.accept_messages(1).await;

    let csv = watchlist_csv(&[
        format!("{},1500.00,{}", env.url("gone"), CONTACT),
        format!("{},\"$1,300\",{}", env.url("cheap"), CONTACT),
        format!("{},not-a-price,{}", env.url("broken"), CONTACT),
        format!("{},2000,{}", env.url("pricey"), CONTACT),
        format!("{},50,+64 21 123 4567", env.url("blank")),
    ]);
    let watchlist = load_watchlist(csv.path())?;
    assert_eq!(watchlist.entries.len(), 4);
    assert_eq!(watchlist.rejected.len(), 1);
    assert_eq!(watchlist.rejected[0].line, 4);

    let runner = BatchRunner::from_config(&env.config(), false).await?;
    let report = runner.run_batch(&watchlist.entries).await;

    let labels: Vec<&str> = report.results.iter().map(|r| r.outcome.label()).collect();
    assert_eq!(labels, vec!["fetch_error", "notified", "above_target", "price_not_found"]);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.count("notified"), 1);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["results"][1]["outcome"]["outcome"], "notified");
    assert_eq!(json["summary"]["outcomes"]["fetch_error"], 1);
    println!("✓ Report lists every entry in input order");

    Ok(())
}

#[tokio::test]
async fn test_ledger_suppresses_repeat_across_runs() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    let state = TempDir::new()?;
    env.serve_page("p1", &product_page("$89.99")).await;
    env.accept_messages(1).await;

    let mut config = env.config();
    config.notifications.ledger_path = Some(state.path().join("ledger.json"));
    let entries = vec![entry(env.url("p1"), "100")];

    let first = BatchRunner::from_config(&config, false).await?.run_batch(&entries).await;
    assert_eq!(first.summary.count("notified"), 1);
    assert!(state.path().join("ledger.json").exists());

    // A fresh process picks the ledger up from disk
    let second = BatchRunner::from_config(&config, false).await?.run_batch(&entries).await;
    assert_eq!(second.summary.count("already_notified"), 1);

    Ok(())
}

#[tokio::test]
async fn test_configured_site_selector_wins() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page(
        "p1",
        r#"<html><body>
             <p class="promo">Free shipping over $5.00</p>
             <b id="our-price">$75.00</b>
           </body></html>"#,
    )
    .await;
    env.accept_messages(0).await;

    let mut config = env.config();
    config.sites.push(SiteConfig {
        host: "127.0.0.1".to_string(),
        price_selector: "#our-price".to_string(),
        price_attribute: None,
    });

    let runner = BatchRunner::from_config(&config, false).await?;
    let results = runner.run(&[entry(env.url("p1"), "60")]).await;

    assert_eq!(
        results[0].outcome,
        Outcome::AboveTarget {
            price: Decimal::from_str("75.00")?
        }
    );

    Ok(())
}
