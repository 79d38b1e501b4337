pub mod admins;
pub mod comparison;
pub mod details;
pub mod email;
pub mod images;
pub mod import;
pub mod metrics;
pub mod nearby;
pub mod places;
pub mod preschools;
pub mod reviews;
