//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod movie;
pub mod room;
pub mod showtime_session;
pub mod showtime_slot;
pub mod voucher;

// Re-export specific types to avoid conflicts
pub use movie::{Column as MovieColumn, Entity as Movie, Model as MovieModel};
pub use room::{Column as RoomColumn, Entity as Room, Model as RoomModel};
pub use showtime_session::{
    Column as SessionColumn, Entity as ShowtimeSession, Model as SessionModel,
};
pub use showtime_slot::{Column as SlotColumn, Entity as ShowtimeSlot, Model as SlotModel};
pub use voucher::{
    Column as VoucherColumn, DiscountScope, Entity as Voucher, Model as VoucherModel,
    VoucherStatus, VoucherType,
};
