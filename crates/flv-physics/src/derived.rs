//! Memo of quantities that depend on the parameters alone.
//!
//! One memo lives in each [`EvalContext`](crate::EvalContext), so a single
//! observable evaluation solves for the CKM matrix once per distinct set of
//! inputs. Entries are keyed by the bit patterns of every input, which keeps
//! the decay and its CP conjugate apart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use flv_core::{FlvError, ParameterStore};

use crate::ckm::CkmMatrix;

type CkmKey = [u64; 4];

/// Per-evaluation memo of derived quantities.
#[derive(Debug, Default)]
pub struct DerivedCache {
    ckm: Mutex<BTreeMap<CkmKey, CkmMatrix>>,
    ckm_solves: AtomicUsize,
}

impl DerivedCache {
    /// Empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// CKM matrix of `par`, solved at most once per distinct `(Vus, Vub, Vcb, gamma)`.
    ///
    /// Failed solves are not stored.
    pub fn ckm(&self, par: &ParameterStore) -> Result<CkmMatrix, FlvError> {
        let inputs = [
            par.get("Vus")?,
            par.get("Vub")?,
            par.get("Vcb")?,
            par.get("gamma")?,
        ];
        let key = inputs.map(f64::to_bits);
        if let Some(ckm) = self.lock().get(&key) {
            return Ok(*ckm);
        }
        let ckm = CkmMatrix::from_tree(inputs[0], inputs[1], inputs[2], inputs[3])?;
        self.ckm_solves.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key, ckm);
        Ok(ckm)
    }

    /// Number of CKM solves performed so far.
    pub fn ckm_solves(&self) -> usize {
        self.ckm_solves.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<CkmKey, CkmMatrix>> {
        self.ckm.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
