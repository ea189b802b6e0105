pub mod display;
pub mod location_fix;
pub mod reducer;
pub mod trip_state;

pub use location_fix::{DistanceModel, LocationFix};
pub use reducer::{Effect, Transition, TripCommand, TripEvent, TripReducer};
pub use trip_state::{Phase, TripState};
