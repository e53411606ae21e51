//! Математические функции и утилиты

use core::f32::consts::PI;

/// Ограничение значения в заданных пределах
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Преобразование градусов в радианы
#[inline]
pub const fn deg_to_rad(deg: f32) -> f32 {
    deg * (PI / 180.0)
}

/// Преобразование радианов в градусы
#[inline]
pub const fn rad_to_deg(rad: f32) -> f32 {
    rad * (180.0 / PI)
}

/// Курс движения по компонентам скорости North/East
///
/// Возвращает градусы в диапазоне (-180, 180], при нулевой скорости 0.
#[inline]
pub fn course_bearing_deg(north: f32, east: f32) -> f32 {
    rad_to_deg(libm::atan2f(east, north))
}

/// Квадратный корень с защитой от отрицательных значений
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        libm::sqrtf(value)
    }
}

/// Вычисление длины 2D вектора
#[inline]
pub fn vector2_length(x: f32, y: f32) -> f32 {
    safe_sqrt(x * x + y * y)
}
