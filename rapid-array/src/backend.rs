//! Bridge to an external linear-algebra library.
//!
//! A backend is chosen once per process: either explicitly with [`install_backend`] before the
//! first contraction, or lazily from the `RAPID_BLAS` environment variable (`none`, `openblas`
//! or `auto`). Backends may decline any call, in which case the in-engine kernels run instead.

use super::*;
use std::env;
use std::sync::OnceLock;

pub trait LinearAlgebraBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn sdot(&self, a: &[f32], b: &[f32]) -> Option<f32> {
        let _ = (a, b);
        None
    }

    fn ddot(&self, a: &[f64], b: &[f64]) -> Option<f64> {
        let _ = (a, b);
        None
    }

    /// Row-major `c = a * b` with `a: m x k`, `b: k x n`, `c: m x n`.
    fn sgemm(&self, m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) -> bool {
        let _ = (m, k, n, a, b, c);
        false
    }

    fn dgemm(&self, m: usize, k: usize, n: usize, a: &[f64], b: &[f64], c: &mut [f64]) -> bool {
        let _ = (m, k, n, a, b, c);
        false
    }
}

/// Declines every call.
pub struct NoBackend;

impl LinearAlgebraBackend for NoBackend {
    fn name(&self) -> &'static str {
        "none"
    }
}

static BACKEND: OnceLock<Box<dyn LinearAlgebraBackend>> = OnceLock::new();

/// Installs `backend` for the rest of the process.
///
/// Fails when a backend was already installed or selected by an earlier contraction.
pub fn install_backend(backend: Box<dyn LinearAlgebraBackend>) -> Result<()> {
    let name = backend.name();
    BACKEND.set(backend).map_err(|_| {
        ArrayError::ConfigurationError(format!(
            "cannot install backend '{name}': '{}' is already in use",
            current_backend().name()
        ))
    })?;
    log::debug!("linear algebra backend installed: {name}");
    Ok(())
}

pub fn current_backend() -> &'static dyn LinearAlgebraBackend {
    BACKEND.get_or_init(select_backend).as_ref()
}

fn select_backend() -> Box<dyn LinearAlgebraBackend> {
    let requested = env::var("RAPID_BLAS").unwrap_or_else(|_| "auto".to_string());
    let backend = backend_by_name(&requested);
    log::debug!("linear algebra backend selected: {} (RAPID_BLAS={requested})", backend.name());
    backend
}

fn backend_by_name(name: &str) -> Box<dyn LinearAlgebraBackend> {
    match name.trim().to_lowercase().as_str() {
        "none" => Box::new(NoBackend),
        "openblas" => build_openblas().unwrap_or_else(|| {
            log::warn!("RAPID_BLAS=openblas but the crate was built without the `openblas` feature");
            Box::new(NoBackend)
        }),
        "auto" | "" => build_openblas().unwrap_or_else(|| Box::new(NoBackend)),
        other => {
            log::warn!("unknown RAPID_BLAS value '{other}', falling back to none");
            Box::new(NoBackend)
        }
    }
}

#[cfg(feature = "openblas")]
fn build_openblas() -> Option<Box<dyn LinearAlgebraBackend>> {
    Some(Box::new(OpenBlasBackend))
}

#[cfg(not(feature = "openblas"))]
fn build_openblas() -> Option<Box<dyn LinearAlgebraBackend>> {
    None
}

/// CBLAS entry points of the system OpenBLAS.
#[cfg(feature = "openblas")]
pub struct OpenBlasBackend;

#[cfg(feature = "openblas")]
fn fits_blas_int(dims: &[usize]) -> bool {
    dims.iter().all(|&d| d > 0 && d <= i32::MAX as usize)
}

#[cfg(feature = "openblas")]
impl LinearAlgebraBackend for OpenBlasBackend {
    fn name(&self) -> &'static str {
        "openblas"
    }

    fn sdot(&self, a: &[f32], b: &[f32]) -> Option<f32> {
        if a.len() != b.len() || !fits_blas_int(&[a.len()]) {
            return None;
        }
        Some(unsafe { cblas_sdot(a.len() as i32, a.as_ptr(), 1, b.as_ptr(), 1) })
    }

    fn ddot(&self, a: &[f64], b: &[f64]) -> Option<f64> {
        if a.len() != b.len() || !fits_blas_int(&[a.len()]) {
            return None;
        }
        Some(unsafe { cblas_ddot(a.len() as i32, a.as_ptr(), 1, b.as_ptr(), 1) })
    }

    fn sgemm(&self, m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) -> bool {
        if !fits_blas_int(&[m, k, n]) || a.len() != m * k || b.len() != k * n || c.len() != m * n {
            return false;
        }
        unsafe {
            cblas_sgemm(
                CBLAS_ROW_MAJOR,
                CBLAS_NO_TRANS,
                CBLAS_NO_TRANS,
                m as i32,
                n as i32,
                k as i32,
                1.0,
                a.as_ptr(),
                k as i32,
                b.as_ptr(),
                n as i32,
                0.0,
                c.as_mut_ptr(),
                n as i32,
            );
        }
        true
    }

    fn dgemm(&self, m: usize, k: usize, n: usize, a: &[f64], b: &[f64], c: &mut [f64]) -> bool {
        if !fits_blas_int(&[m, k, n]) || a.len() != m * k || b.len() != k * n || c.len() != m * n {
            return false;
        }
        unsafe {
            cblas_dgemm(
                CBLAS_ROW_MAJOR,
                CBLAS_NO_TRANS,
                CBLAS_NO_TRANS,
                m as i32,
                n as i32,
                k as i32,
                1.0,
                a.as_ptr(),
                k as i32,
                b.as_ptr(),
                n as i32,
                0.0,
                c.as_mut_ptr(),
                n as i32,
            );
        }
        true
    }
}

#[cfg(feature = "openblas")]
const CBLAS_ROW_MAJOR: i32 = 101;
#[cfg(feature = "openblas")]
const CBLAS_NO_TRANS: i32 = 111;

#[cfg(feature = "openblas")]
#[link(name = "openblas")]
unsafe extern "C" {
    fn cblas_sdot(n: i32, x: *const f32, incx: i32, y: *const f32, incy: i32) -> f32;
    fn cblas_ddot(n: i32, x: *const f64, incx: i32, y: *const f64, incy: i32) -> f64;
    fn cblas_sgemm(
        order: i32,
        trans_a: i32,
        trans_b: i32,
        m: i32,
        n: i32,
        k: i32,
        alpha: f32,
        a: *const f32,
        lda: i32,
        b: *const f32,
        ldb: i32,
        beta: f32,
        c: *mut f32,
        ldc: i32,
    );
    fn cblas_dgemm(
        order: i32,
        trans_a: i32,
        trans_b: i32,
        m: i32,
        n: i32,
        k: i32,
        alpha: f64,
        a: *const f64,
        lda: i32,
        b: *const f64,
        ldb: i32,
        beta: f64,
        c: *mut f64,
        ldc: i32,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DotOnly;

    impl LinearAlgebraBackend for DotOnly {
        fn name(&self) -> &'static str {
            "dot-only"
        }

        fn sdot(&self, a: &[f32], b: &[f32]) -> Option<f32> {
            Some(a.iter().zip(b).map(|(x, y)| x * y).sum())
        }
    }

    #[test]
    fn unimplemented_hooks_decline() {
        let backend = DotOnly;
        let mut c = [0.0f64; 1];

        assert_eq!(backend.sdot(&[1.0, 2.0], &[3.0, 4.0]), Some(11.0));
        assert_eq!(backend.ddot(&[1.0], &[1.0]), None);
        assert!(!backend.dgemm(1, 1, 1, &[1.0], &[1.0], &mut c));
        assert!(!NoBackend.sgemm(1, 1, 1, &[1.0], &[1.0], &mut [0.0]));
    }

    #[test]
    fn backend_names_are_resolved() {
        assert_eq!(backend_by_name("none").name(), "none");
        assert_eq!(backend_by_name(" NONE ").name(), "none");
        assert_eq!(backend_by_name("mkl").name(), "none");

        let expected = if cfg!(feature = "openblas") { "openblas" } else { "none" };
        assert_eq!(backend_by_name("auto").name(), expected);
        assert_eq!(backend_by_name("openblas").name(), expected);
    }

    #[test]
    fn second_installation_is_rejected() {
        let _ = current_backend();
        assert!(matches!(
            install_backend(Box::new(NoBackend)),
            Err(ArrayError::ConfigurationError(_))
        ));
    }
}
