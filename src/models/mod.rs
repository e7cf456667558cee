//! Thin model adapters and the output validation shared by every model call.
//!
//! Real framework integrations live outside this crate; the adapters here
//! wrap plain closures so the explainers can be driven by any scoring
//! function.

pub mod function;
pub mod teacher_forcing;
pub mod topk_lm;

pub use function::FnModel;
pub use teacher_forcing::TeacherForcing;
pub use topk_lm::TopKLm;

use crate::core::error::{Result, ShapError};
use crate::core::traits::Model;
use crate::core::types::Instance;
use ndarray::Array2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Call `model` on `batch` and validate its output.
///
/// Model failures and malformed output (wrong row count, no columns,
/// non-finite values) are reported as model invocation errors. The row a
/// model blames is kept in the message; the error's instance index is left
/// for the caller to set.
pub fn checked_predict(model: &dyn Model, batch: &[Instance]) -> Result<Array2<f64>> {
    let outputs = model.predict(batch).map_err(|e| match e {
        ShapError::ModelInvocation { instance, message } => {
            ShapError::model_invocation(0, format!("masked row {}: {}", instance, message))
        }
        other => ShapError::model_invocation(0, other.to_string()),
    })?;
    if outputs.nrows() != batch.len() {
        return Err(ShapError::model_invocation(
            0,
            format!(
                "model returned {} output rows for a batch of {}",
                outputs.nrows(),
                batch.len()
            ),
        ));
    }
    if outputs.ncols() == 0 {
        return Err(ShapError::model_invocation(0, "model returned no output columns"));
    }
    if let Some(bad) = outputs.iter().find(|v| !v.is_finite()) {
        return Err(ShapError::model_invocation(
            0,
            format!("model returned a non-finite output ({})", bad),
        ));
    }
    Ok(outputs)
}

/// The model of one explainer as seen by a single explanation.
///
/// Calls to a model that does not support concurrency hold `lock` for their
/// whole duration. Masks scored outside the attribution engines (while
/// preparing a masker) are charged to `spent`.
#[derive(Debug)]
pub(crate) struct ModelGate<'a> {
    model: &'a dyn Model,
    lock: &'a Mutex<()>,
    spent: AtomicUsize,
}

impl<'a> ModelGate<'a> {
    pub(crate) fn new(model: &'a dyn Model, lock: &'a Mutex<()>) -> Self {
        ModelGate {
            model,
            lock,
            spent: AtomicUsize::new(0),
        }
    }

    fn serialize(&self) -> Result<Option<MutexGuard<'a, ()>>> {
        if self.model.supports_concurrency() {
            return Ok(None);
        }
        self.lock
            .lock()
            .map(Some)
            .map_err(|_| ShapError::internal("model lock poisoned by a panicking worker"))
    }

    /// Validated prediction, serialized unless the model is concurrent.
    pub(crate) fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>> {
        let _guard = self.serialize()?;
        checked_predict(self.model, batch)
    }

    /// Reference output of `instance`, serialized like [`ModelGate::predict`].
    pub(crate) fn reference_output(&self, instance: &Instance) -> Result<Option<Instance>> {
        let _guard = self.serialize()?;
        self.model.reference_output(instance)
    }

    /// Record `masks` scored outside the attribution engines.
    pub(crate) fn charge(&self, masks: usize) {
        self.spent.fetch_add(masks, Ordering::SeqCst);
    }

    /// Masks charged so far.
    pub(crate) fn spent(&self) -> usize {
        self.spent.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct Fixed(Array2<f64>);

    impl Model for Fixed {
        fn predict(&self, _batch: &[Instance]) -> Result<Array2<f64>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Model for Failing {
        fn predict(&self, _batch: &[Instance]) -> Result<Array2<f64>> {
            Err(ShapError::numerical("overflow"))
        }
    }

    #[test]
    fn test_checked_predict_accepts_valid_output() {
        let model = Fixed(array![[1.0], [2.0]]);
        let batch = vec![Instance::tabular(&[0.0]); 2];
        assert_eq!(checked_predict(&model, &batch).unwrap(), array![[1.0], [2.0]]);
    }

    #[test]
    fn test_checked_predict_rejects_malformed_output() {
        let batch = vec![Instance::tabular(&[0.0]); 2];
        for outputs in [array![[1.0]], array![[1.0], [f64::NAN]], Array2::zeros((2, 0))] {
            let err = checked_predict(&Fixed(outputs), &batch).unwrap_err();
            assert_eq!(err.category(), "model_invocation");
        }
    }

    #[derive(Debug)]
    struct BlamesRow(usize);

    impl Model for BlamesRow {
        fn predict(&self, _batch: &[Instance]) -> Result<Array2<f64>> {
            Err(ShapError::model_invocation(self.0, "bad row"))
        }
    }

    #[test]
    fn test_blamed_row_moves_into_message() {
        let batch = vec![Instance::tabular(&[0.0]); 8];
        let err = checked_predict(&BlamesRow(6), &batch).unwrap_err();
        match err {
            ShapError::ModelInvocation { instance, message } => {
                assert_eq!(instance, 0);
                assert!(message.contains("masked row 6"));
                assert!(message.contains("bad row"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_gate_charges_and_forwards() {
        let lock = Mutex::new(());
        let model = Fixed(array![[1.0]]);
        let gate = ModelGate::new(&model, &lock);
        assert_eq!(gate.predict(&[Instance::tabular(&[0.0])]).unwrap(), array![[1.0]]);
        assert!(gate.reference_output(&Instance::tabular(&[0.0])).unwrap().is_none());
        assert_eq!(gate.spent(), 0);
        gate.charge(1);
        gate.charge(2);
        assert_eq!(gate.spent(), 3);
    }

    #[test]
    fn test_gate_holds_lock_for_non_concurrent_models() {
        let lock = Mutex::new(());
        let model = Fixed(array![[1.0]]);
        let gate = ModelGate::new(&model, &lock);
        let guard = gate.serialize().unwrap();
        assert!(guard.is_some());
        assert!(lock.try_lock().is_err());
    }

    #[test]
    fn test_checked_predict_wraps_model_errors() {
        let err = checked_predict(&Failing, &[Instance::tabular(&[0.0])]).unwrap_err();
        assert_eq!(err.category(), "model_invocation");
        assert!(err.to_string().contains("overflow"));
    }
}
