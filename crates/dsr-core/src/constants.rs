//! Constantes del motor core.

/// Máximo de entradas del execution log embebidas por dataset en un reporte
/// `verbose`.
pub const EMBEDDED_EXECUTION_LOG_LIMIT: usize = 50;

/// Máximo de elementos aceptados por una operación bulk.
pub const BULK_OPERATION_LIMIT: usize = 50;

/// Marcador que sustituye a los valores reales en las consultas de dry-run.
pub const DRY_RUN_PLACEHOLDER: &str = "?";

/// Valor con el que se siembra cada identity key en un dry-run desde
/// repositorio.
pub const DRY_RUN_IDENTITY_VALUE: &str = "something";
