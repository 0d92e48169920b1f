use std::fmt;

/// Fixed-point decimal with 4 decimal places, stored as a scaled integer.
///
/// Used for both funds and reputation so that batch totals stay exact no
/// matter how many records are summed. Addition saturates at the bounds of
/// the scaled representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 10_000;
    const DECIMALS: usize = 4;

    pub const ZERO: Amount = Amount(0);

    /// Out-of-range values saturate; see [`checked_from_float`](Self::checked_from_float).
    pub fn from_float(value: f64) -> Self {
        Amount((value * Self::SCALE as f64).round() as i64)
    }

    /// Like [`from_float`](Self::from_float), but `None` for values that are
    /// not finite or do not fit the scaled representation.
    pub fn checked_from_float(value: f64) -> Option<Self> {
        let scaled = (value * Self::SCALE as f64).round();
        let fits = scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64;
        fits.then(|| Amount(scaled as i64))
    }

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    pub fn to_float(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Without a precision the shortest exact form is printed (`2000`, `2.5`).
/// With one (`{:.1}`) the value is rounded half away from zero; precisions
/// above 4 are clamped.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;

        match f.precision() {
            Some(precision) => {
                let precision = precision.min(Self::DECIMALS);
                let step = 10u64.pow((Self::DECIMALS - precision) as u32);
                let unit = 10u64.pow(precision as u32);
                let rounded = (abs + step / 2) / step;
                let sign = if self.0 < 0 && rounded != 0 { "-" } else { "" };
                let whole = rounded / unit;
                if precision == 0 {
                    write!(f, "{sign}{whole}")
                } else {
                    let frac = rounded % unit;
                    write!(f, "{sign}{whole}.{frac:0precision$}")
                }
            }
            None => {
                let sign = if self.0 < 0 { "-" } else { "" };
                let whole = abs / scale;
                let frac = abs % scale;
                if frac == 0 {
                    write!(f, "{sign}{whole}")
                } else {
                    let digits = format!("{frac:04}");
                    write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
                }
            }
        }
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, amount| acc + amount)
    }
}
