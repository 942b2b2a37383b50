pub mod evaluator;
pub mod runner;

pub use evaluator::{evaluate, EvalHook};
pub use runner::BatchRunner;
