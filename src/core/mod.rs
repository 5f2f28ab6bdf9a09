/// Free/busy slot grid for one table and date
pub mod availability;

/// Pending order (cart) operations and checkout
pub mod cart;

/// Menu categories and dishes
pub mod catalog;

/// Injectable source of the current time
pub mod clock;

/// Coupon attachment and coupon administration
pub mod coupon;

/// Reservation cancellation and history
pub mod lifecycle;

/// Per-key async locks for contended writes
pub mod locks;

/// Fire-and-forget notifications
pub mod notify;

/// Order total computation
pub mod pricing;

/// Table selection and reservation commit
pub mod reservation;

/// Dish reviews and ratings
pub mod review;

/// Tables, operating hours and reservation reads
pub mod schedule;

/// Idempotent seeding from the venue file
pub mod seed;
