//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coupon;
pub mod dining_table;
pub mod dish;
pub mod dish_category;
pub mod operating_hours;
pub mod order;
pub mod order_item;
pub mod reservation;
pub mod review;

// Re-export specific types to avoid conflicts
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
pub use dining_table::{
    Column as DiningTableColumn, Entity as DiningTable, Model as DiningTableModel,
};
pub use dish::{Column as DishColumn, Entity as Dish, Model as DishModel};
pub use dish_category::{
    Column as DishCategoryColumn, Entity as DishCategory, Model as DishCategoryModel,
};
pub use operating_hours::{
    Column as OperatingHoursColumn, Entity as OperatingHours, Model as OperatingHoursModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use reservation::{
    Column as ReservationColumn, Entity as Reservation, Model as ReservationModel,
    ReservationStatus,
};
pub use review::{Column as ReviewColumn, Entity as Review, Model as ReviewModel};
