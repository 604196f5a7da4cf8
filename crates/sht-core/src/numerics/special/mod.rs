pub mod harmonics;
pub mod quadrature;

pub use harmonics::{
    AzimuthalRecurrence, checked_coefficient_count, coefficient_count, coefficient_index,
    fill_legendre_table, legendre_table, legendre_table_index, legendre_table_len, real_y_lm,
};
pub use quadrature::{GaussLegendreRule, QuadratureError, gauss_legendre};
