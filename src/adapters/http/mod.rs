pub mod allergy;
pub mod auth;
pub mod cart;
pub mod client;
pub mod jwt;
pub mod path;
pub mod product;

pub use allergy::HttpAllergyRepository;
pub use auth::{AuthApi, LoginOutcome};
pub use cart::HttpCartRepository;
pub use client::{ApiClient, ApiRequest, ApiResponse, ApiSettings, FormPart};
pub use path::HttpPlaceRepository;
pub use product::HttpProductVision;
