//! Catalog and staff models consumed by the order engine (read-only).

pub mod employee;
pub mod product;

pub use employee::{Employee, EmployeeRole, ManagerCapabilities};
pub use product::Product;
