//! Plate registry client for mapion.
//!
//! Normalizes and validates plates, caches the upstream bearer token, and
//! resolves plates against the registry API.

pub mod auth;
pub mod client;
pub mod error;
pub mod plate;
pub mod token;

pub use {
    auth::{AuthStrategy, Credentials, default_strategies},
    client::{LookupResult, NOT_AVAILABLE, PlateLookup, RegistryClient, VehicleRecord},
    error::{Error, Result},
    plate::{InvalidPlate, NormalizedPlate, PlateFormat, is_valid, normalize},
    token::{AuthToken, TokenCache},
};
