//! dsr-masking – estrategias de enmascaramiento para acciones de borrado.
//!
//! Provee el contrato `MaskingStrategy` y las implementaciones base
//! (`hash`, `null_rewrite`, `random_string_rewrite`, `string_rewrite`),
//! junto con la generación de secretos por solicitud y un registro de
//! estrategias indexado por nombre.

pub mod errors;
pub mod format_preservation;
pub mod hash;
pub mod null_rewrite;
pub mod random_string;
pub mod registry;
pub mod secrets;
pub mod strategy;
pub mod string_rewrite;

pub use errors::MaskingError;
pub use format_preservation::FormatPreservation;
pub use hash::{HashAlgorithm, HashMaskingConfiguration, HashMaskingStrategy, HASH};
pub use null_rewrite::{NullRewriteStrategy, NULL_REWRITE};
pub use random_string::{RandomStringMaskingConfiguration, RandomStringRewriteStrategy, RANDOM_STRING_REWRITE};
pub use registry::{get_strategy, MaskingStrategyRegistry, StrategyFactory};
pub use secrets::{generate_secret_string, MaskingSecretCache, SecretStore, SecretType};
pub use strategy::MaskingStrategy;
pub use string_rewrite::{StringRewriteMaskingConfiguration, StringRewriteStrategy, STRING_REWRITE};
