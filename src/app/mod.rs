pub mod allergy;
pub mod cart;
pub mod session;
pub mod store_finder;

pub use allergy::{AllergyController, AllergyState};
pub use cart::{CartController, CartState};
pub use session::LookeySession;
pub use store_finder::{FinderState, StoreFinder, StoreSummary};
