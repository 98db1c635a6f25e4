pub mod model;
pub mod rest;
pub mod service;
