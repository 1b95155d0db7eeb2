pub mod intent;

pub use intent::{HttpIntentService, IntentService};
