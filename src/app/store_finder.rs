use crate::domain::model::{Coordinates, Place};
use crate::domain::ports::{LocationProvider, PlaceRepository};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

const MAX_STORES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub name: String,
    pub distance_meters: u32,
    pub lat: f64,
    pub lng: f64,
}

impl From<Place> for StoreSummary {
    fn from(place: Place) -> Self {
        Self {
            name: place.name,
            distance_meters: place.distance.unwrap_or(0),
            lat: place.lat,
            lng: place.lng,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinderState {
    pub loading: bool,
    pub stores: Vec<StoreSummary>,
    pub error: Option<String>,
    pub here: Option<Coordinates>,
}

/// Looks up the closest convenience stores around the user.
pub struct StoreFinder {
    places: Arc<dyn PlaceRepository>,
    location: Arc<dyn LocationProvider>,
    state: watch::Sender<FinderState>,
}

impl StoreFinder {
    pub fn new(places: Arc<dyn PlaceRepository>, location: Arc<dyn LocationProvider>) -> Self {
        let (state, _) = watch::channel(FinderState::default());
        Self {
            places,
            location,
            state,
        }
    }

    pub fn state(&self) -> FinderState {
        self.state.borrow().clone()
    }

    pub async fn find_nearby(&self) -> FinderState {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let Some(here) = self.location.current_location().await else {
            tracing::warn!("📍 No current location");
            self.state.send_modify(|s| {
                s.loading = false;
                s.error = Some("현재 위치를 가져올 수 없습니다.".to_string());
            });
            return self.state();
        };

        let next = match self.places.nearby(here).await {
            Ok(places) => {
                tracing::info!("📍 {} stores near ({}, {})", places.len(), here.lat, here.lng);
                FinderState {
                    loading: false,
                    stores: places
                        .into_iter()
                        .take(MAX_STORES)
                        .map(StoreSummary::from)
                        .collect(),
                    error: None,
                    here: Some(here),
                }
            }
            Err(e) => {
                tracing::error!("📍 Nearby lookup failed: {}", e);
                FinderState {
                    error: Some(format!("가까운 편의점 조회 실패: {}", e)),
                    ..FinderState::default()
                }
            }
        };

        self.state.send_replace(next.clone());
        next
    }
}
