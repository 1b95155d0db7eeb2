pub mod action;
pub mod filter;
pub mod normalize;

pub use action::{Action, DueShift, NewTask, QueryKind, TaskUpdates};
pub use filter::{Filter, PositionRef, StatusFilter};
pub use normalize::actions_from_value;
