mod error;
mod wide;

pub use error::{bad_shape_err, config_err, err, mismatch_err, overflow_err, restart_err, Error,
                ErrorKind, Result};
pub use wide::{WideInt128, EMPTY_VALUE, MAX_DECIMAL_LEN, NULL_VALUE};
