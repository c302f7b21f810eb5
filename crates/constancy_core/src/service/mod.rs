//! Use-case services over record repositories.

pub mod record_service;
