//! Internal logging macros.
//!
//! Messages are routed to `defmt` when the `defmt-03` feature is enabled, to the
//! `log` facade when the `log` feature is enabled, and compiled out otherwise.
//! Format strings must stay compatible with both backends (plain `{}` placeholders).

#![macro_use]
#![allow(unused_macros)]

macro_rules! log_debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-03")]
            ::defmt::debug!($s $(, $x)*);

            #[cfg(all(feature = "log", not(feature = "defmt-03")))]
            ::log::debug!($s $(, $x)*);

            #[cfg(not(any(feature = "log", feature = "defmt-03")))]
            {
                $( let _ = &$x; )*
            }
        }
    };
}

macro_rules! log_info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-03")]
            ::defmt::info!($s $(, $x)*);

            #[cfg(all(feature = "log", not(feature = "defmt-03")))]
            ::log::info!($s $(, $x)*);

            #[cfg(not(any(feature = "log", feature = "defmt-03")))]
            {
                $( let _ = &$x; )*
            }
        }
    };
}

macro_rules! log_warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-03")]
            ::defmt::warn!($s $(, $x)*);

            #[cfg(all(feature = "log", not(feature = "defmt-03")))]
            ::log::warn!($s $(, $x)*);

            #[cfg(not(any(feature = "log", feature = "defmt-03")))]
            {
                $( let _ = &$x; )*
            }
        }
    };
}
