pub mod power_levels;
pub mod room_lock;

pub use power_levels::PowerLevelCache;
pub use room_lock::RoomLocks;
