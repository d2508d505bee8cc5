#[cfg(feature = "server")]
pub mod config;

#[cfg(feature = "server")]
pub mod db;

#[cfg(feature = "server")]
pub mod error_convert;

#[cfg(feature = "server")]
pub mod telemetry;

#[cfg(feature = "server")]
pub mod s3;

#[cfg(feature = "server")]
pub mod storage;

#[cfg(feature = "server")]
pub mod typst;

// Chapter-case pipeline modules
#[cfg(feature = "server")]
pub mod repo;

#[cfg(feature = "server")]
pub mod store;

#[cfg(feature = "server")]
pub mod render;

#[cfg(feature = "server")]
pub mod resolver;

#[cfg(feature = "server")]
pub mod issuance;

#[cfg(feature = "server")]
pub mod lifecycle;

#[cfg(feature = "server")]
pub mod roznama;

#[cfg(feature = "server")]
pub mod pipeline;
