//! Интерфейс внутреннего контроллера скорости/позиции North/East
//!
//! Сам ПИД реализован в ядре управления прошивки. Контроллер режима
//! скоростного руления работает с ним только через этот контракт:
//! подача уставки и измерения, чтение сглаженной желаемой скорости и
//! сырой команды North/East до поворота в связанные оси.

use nalgebra::Vector2;

/// Контракт двухосевого контроллера North/East
pub trait NeControl {
    /// Включение: сброс интеграторов и внутреннего состояния
    fn activate(&mut self);

    /// Выключение: перевод в холостой режим
    fn deactivate(&mut self);

    /// Параметры контура скорости
    fn update_parameters(
        &mut self,
        kp: f32,
        ki: f32,
        kd: f32,
        i_limit: f32,
        dt: f32,
        velocity_max: f32,
    );

    /// Позиционная подпитка контура скорости
    fn update_positional_parameters(&mut self, pos_p: f32);

    /// Границы и упреждение выходной команды
    fn update_command_parameters(
        &mut self,
        min_command: f32,
        max_command: f32,
        velocity_feedforward: f32,
    );

    /// Новая уставка скорости (North, East)
    fn update_velocity_setpoint(&mut self, setpoint: Vector2<f32>);

    /// Текущее измерение скорости; продвигает контроллер на один шаг
    fn update_velocity_state(&mut self, state: Vector2<f32>);

    /// Сглаженная и ограниченная желаемая скорость (North, East)
    fn velocity_desired(&self) -> Vector2<f32>;

    /// Сырая команда (North, East) до поворота в связанные оси
    fn ne_command(&self) -> Vector2<f32>;
}
