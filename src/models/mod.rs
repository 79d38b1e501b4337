pub mod admin;
pub mod admission;
pub mod auth;
pub mod comparison;
pub mod contact;
pub mod franchise;
pub mod pagination;
pub mod places;
pub mod preschool;
pub mod review;
