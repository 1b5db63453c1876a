//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad de trabajo request/response dentro del flujo fijo
//! que se ejecuta por sesión. Este módulo define:
//! - `Step`: interfaz neutral que usa el driver.
//! - `ResponseOptions`: tamaño de página y opciones específicas del step.
//! - `StepRegistry`: lista ordenada e inmutable de steps con nombre único.
//! - `FnStep`: step construido a partir de dos closures.

pub mod definition;
mod fn_step;
mod options;
mod registry;

pub use definition::{check_hresult, Step};
pub use fn_step::FnStep;
pub use options::ResponseOptions;
pub use registry::{registry_hash, StepRegistry};
