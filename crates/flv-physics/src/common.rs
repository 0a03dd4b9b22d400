//! Kinematic helpers and unit conversions shared by all decay modules.

/// Reduced Planck constant in GeV ps; converts lifetimes in ps to GeV^-1.
pub const HBAR_GEV_PS: f64 = 6.582119569e-13;

/// Källén function `a^2 + b^2 + c^2 - 2(ab + bc + ac)`.
pub fn lambda_k(a: f64, b: f64, c: f64) -> f64 {
    a * a + b * b + c * c - 2.0 * (a * b + b * c + a * c)
}

/// Lepton velocity in the dilepton rest frame; zero at and below threshold.
pub fn beta_l(ml: f64, q2: f64) -> f64 {
    if q2 <= 4.0 * ml * ml {
        return 0.0;
    }
    (1.0 - 4.0 * ml * ml / q2).sqrt()
}

/// Lifetime in ps expressed in GeV^-1.
pub fn lifetime_to_gev(tau_ps: f64) -> f64 {
    tau_ps / HBAR_GEV_PS
}

/// Simpson rule with `intervals` (rounded up to even) subintervals.
pub fn simpson<F>(f: F, low: f64, high: f64, intervals: usize) -> Result<f64, flv_core::FlvError>
where
    F: Fn(f64) -> Result<f64, flv_core::FlvError>,
{
    let n = intervals.max(2) + intervals % 2;
    let h = (high - low) / n as f64;
    let mut acc = f(low)? + f(high)?;
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        acc += weight * f(low + h * i as f64)?;
    }
    Ok(acc * h / 3.0)
}
