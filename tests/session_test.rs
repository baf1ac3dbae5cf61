use anyhow::Result;
use httpmock::prelude::*;
use lookey::core::LocateOutcome;
use lookey::domain::ports::SpeechSink;
use lookey::{LocalFrameSource, LookeySession, TomlConfig};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct CapturedSpeech {
    lines: Mutex<Vec<String>>,
}

impl CapturedSpeech {
    fn spoken(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl SpeechSink for CapturedSpeech {
    fn speak(&self, text: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(text.trim_end_matches('\u{200B}').to_string());
    }

    fn stop(&self) {}
}

fn write_config(dir: &TempDir, base_url: &str) -> Result<TomlConfig> {
    let path = dir.path().join("lookey.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[api]
base_url = "{}"
request_timeout_seconds = 10

[auth]
access_token = "access"
refresh_token = "refresh"

[speech]
paced = false

[scan]
immediate = true
max_locate_attempts = 3

[location]
lat = 37.5
lng = 127.1
"#,
            base_url
        ),
    )?;
    Ok(TomlConfig::from_file(&path)?)
}

#[tokio::test]
async fn test_shelf_scan_guides_to_cart_product() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/carts");
            then.status(200).json_body(json!({
                "result": { "items": [
                    { "cart_id": 5, "product_id": 20, "product_name": "새우깡" }
                ]}
            }));
        })
        .await;
    let shelf = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/product/search")
                .header("Authorization", "Bearer access");
            then.status(200).json_body(json!({
                "result": { "count": 2, "matched_names": ["새우깡"] }
            }));
        })
        .await;
    let locate = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/product/search/location");
            then.status(200).json_body(json!({
                "result": {
                    "case": "FOUND",
                    "info": { "name": "새우깡", "price": 1500, "allergy": true }
                }
            }));
        })
        .await;
    let removal = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/v1/carts")
                .json_body(json!({ "cart_id": 5 }));
            then.status(200);
        })
        .await;

    let dir = TempDir::new()?;
    let config = write_config(&dir, &server.base_url())?;
    let frames_dir = dir.path().join("frames");
    std::fs::create_dir(&frames_dir)?;
    std::fs::write(frames_dir.join("01_shelf.jpg"), [0xFF, 0xD8, 0x01])?;
    std::fs::write(frames_dir.join("02_close.jpg"), [0xFF, 0xD8, 0x02])?;

    let speech = Arc::new(CapturedSpeech::default());
    let session = LookeySession::with_speech_sink(config, speech.clone())?;
    assert!(session.is_logged_in());
    assert_eq!(session.cart.load().await?.len(), 1);

    let scan = session.scan_session(LocalFrameSource::from_dir(&frames_dir).await?);
    let matched = scan.start_panorama().await?;
    assert_eq!(matched, vec!["새우깡".to_string()]);
    assert_eq!(scan.state().cart_guide_target.as_deref(), Some("새우깡"));
    assert!(scan.state().show_cart_guide_prompt);

    match scan.confirm_cart_guide().await? {
        LocateOutcome::Found(result) => {
            assert_eq!(result.name, "새우깡");
            assert_eq!(result.price, Some(1500));
            assert!(result.has_allergy);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(scan.state().cart_guide_target.is_none());
    assert!(session.cart.state().lines.is_empty());

    // the server side removal runs in the background
    for _ in 0..50 {
        if removal.hits_async().await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    removal.assert_hits_async(1).await;
    shelf.assert_hits_async(1).await;
    locate.assert_hits_async(1).await;

    session.close().await;
    let spoken = speech.spoken();
    assert!(spoken.iter().any(|line| line == "상품 1개를 찾았습니다."));
    assert!(spoken.iter().any(|line| line == "상품을 찾았습니다!"));
    Ok(())
}

#[tokio::test]
async fn test_nearby_stores_use_configured_location() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/path")
                .query_param("lat", "37.5")
                .query_param("lng", "127.1");
            then.status(200).json_body(json!({
                "result": { "items": [
                    { "name": "CU 강남점", "lat": 37.49, "lng": 127.09, "distance": 80 },
                    { "name": "GS25 역삼점", "lat": 37.51, "lng": 127.11, "distance": 150 }
                ]}
            }));
        })
        .await;

    let dir = TempDir::new()?;
    let session = LookeySession::with_speech_sink(
        write_config(&dir, &server.base_url())?,
        Arc::new(CapturedSpeech::default()),
    )?;

    let state = session.stores.find_nearby().await;
    assert!(state.error.is_none());
    assert_eq!(state.stores.len(), 2);
    assert_eq!(state.stores[0].name, "CU 강남점");
    assert_eq!(state.stores[0].distance_meters, 80);

    session.close().await;
    Ok(())
}

#[tokio::test]
async fn test_session_rejects_invalid_base_url() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write_config(&dir, "not a url")?;

    let result = LookeySession::with_speech_sink(config, Arc::new(CapturedSpeech::default()));
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_session_expiry_is_announced() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/carts");
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh");
            then.status(401);
        })
        .await;

    let dir = TempDir::new()?;
    let speech = Arc::new(CapturedSpeech::default());
    let session =
        LookeySession::with_speech_sink(write_config(&dir, &server.base_url())?, speech.clone())?;

    assert!(session.cart.load().await.is_err());
    assert!(!session.is_logged_in());

    session.close().await;
    assert!(speech
        .spoken()
        .iter()
        .any(|line| line == "세션이 만료되었습니다. 다시 로그인해주세요."));
    Ok(())
}
