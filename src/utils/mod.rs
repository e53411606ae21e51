//! Вспомогательные утилиты

pub mod math;
