// src/lib.rs
pub mod data {
    pub mod containers;
    pub mod handle;
}

pub mod association;
pub mod error;
