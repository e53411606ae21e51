//! Параметры по умолчанию для режима скоростного руления
//!
//! Значения заменяются целиком снимком настроек со станции управления,
//! здесь только стартовая конфигурация.

/// ПИД коэффициенты контура горизонтальной скорости (North/East)
pub mod horizontal_vel_pid {
    pub const KP: f32 = 8.0; // Пропорциональный коэффициент
    pub const KI: f32 = 0.5; // Интегральный коэффициент
    pub const KD: f32 = 0.0; // Дифференциальный коэффициент
    pub const I_LIMIT: f32 = 1000.0; // Ограничение интегральной составляющей
}

/// Параметры контура следования
pub mod follower {
    /// Период цикла управления (мс)
    pub const UPDATE_PERIOD_MS: u16 = 20;

    /// Максимальная горизонтальная скорость (м/с)
    pub const HORIZONTAL_VEL_MAX: f32 = 10.0;

    /// Коэффициент позиционной подпитки контура скорости
    pub const HORIZONTAL_POS_P: f32 = 0.25;

    /// Максимальный угол крена/тангажа (градусы)
    pub const MAX_ROLL_PITCH_DEG: f32 = 20.0;

    /// Коэффициент упреждения по скорости
    pub const VELOCITY_FEEDFORWARD: f32 = 2.0;
}

/// Параметры банка стабилизации, которые читает эта подсистема
pub mod stabilization {
    /// Максимальная скорость рыскания по ручке (градусы/с)
    pub const MAX_YAW_RATE_DPS: f32 = 180.0;
}
