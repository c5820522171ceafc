use std::fmt::Debug;

/// Element types that can be max-pooled.
///
/// `lowest()` is the fill value for padded cells. For floats it is negative
/// infinity, which no sampled value can lose to. Integers have no such value,
/// so they pad with `MIN`; when real data also holds `MIN`, a padded cell can
/// tie with it and the reported argmax may point into the padding (the max
/// value itself is still correct).
pub trait PoolElement: Copy + PartialOrd + Debug + Send + Sync + 'static {
    fn lowest() -> Self;

    fn is_nan(self) -> bool {
        false
    }
}

impl PoolElement for f32 {
    fn lowest() -> Self {
        f32::NEG_INFINITY
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl PoolElement for f64 {
    fn lowest() -> Self {
        f64::NEG_INFINITY
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

macro_rules! impl_pool_element_int {
    ($($t:ty),*) => {
        $(
            impl PoolElement for $t {
                fn lowest() -> Self {
                    <$t>::MIN
                }
            }
        )*
    };
}

impl_pool_element_int!(i8, i16, i32, i64, u8, u16, u32, u64);
