//! Postgres access, one module per table. Every function takes the pool
//! explicitly and maps driver errors through `SqlxErrorExt`.

pub mod case;
pub mod case_event;
pub mod case_file;
pub mod form;
pub mod person;
pub mod police_station;
